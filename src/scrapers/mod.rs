//! Liturgy source scrapers.
//!
//! This module holds the source registry and the two stages every source
//! goes through:
//!
//! 1. **Fetching** ([`fetch`]): download the page directly, or through a
//!    CORS proxy when the direct request fails
//! 2. **Extraction** ([`extract`]): locate the gospel reference and body in
//!    the downloaded HTML
//!
//! # Default Sources
//!
//! | Priority | Source | URL |
//! |----------|--------|-----|
//! | 1 | Canção Nova | `https://liturgia.cancaonova.com/pb/` |
//! | 2 | Vatican News | `https://www.vaticannews.va/pt/evangelho-do-dia.html` |
//! | 3 | CNBB | `https://www.cnbb.org.br/liturgia-diaria/` |
//! | 4 | Paulus | `https://www.paulus.com.br/portal/liturgia-diaria/` |
//!
//! Sources are tried strictly in this order and the first usable reading
//! wins. The list can be replaced through the configuration file.

pub mod extract;
pub mod fetch;

use crate::models::SourceDescriptor;

/// CORS proxy used when a direct request fails. Answers
/// `GET <base>?url=<target>` with a JSON envelope `{ "contents": "<html>" }`.
pub const DEFAULT_PROXY_BASE: &str = "https://api.allorigins.win/get";

const DEFAULT_SOURCES: &[(&str, &str)] = &[
    ("Canção Nova", "https://liturgia.cancaonova.com/pb/"),
    (
        "Vatican News",
        "https://www.vaticannews.va/pt/evangelho-do-dia.html",
    ),
    ("CNBB", "https://www.cnbb.org.br/liturgia-diaria/"),
    ("Paulus", "https://www.paulus.com.br/portal/liturgia-diaria/"),
];

/// The built-in source registry, highest priority first.
pub fn default_sources() -> Vec<SourceDescriptor> {
    DEFAULT_SOURCES
        .iter()
        .map(|(name, url)| SourceDescriptor::new(*name, *url))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sources_start_with_cancao_nova() {
        let sources = default_sources();
        assert_eq!(sources.len(), 4);
        assert_eq!(sources[0].name, "Canção Nova");
        assert!(sources.iter().all(|s| s.url.starts_with("https://")));
    }
}
