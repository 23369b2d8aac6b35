//! Data models for the gospel-acquisition pipeline.
//!
//! This module defines the core data structures shared by every stage:
//! - [`GospelRecord`]: a validated gospel reading (reference + body text)
//! - [`SourceDescriptor`]: one liturgy site in the source registry
//! - [`CacheEntry`]: the resolved reading for a calendar date
//! - [`Origin`]: where a cached reading came from
//!
//! `GospelRecord` can only be built through [`GospelRecord::new`] (or the
//! equivalent `serde` path), so every value in circulation satisfies the
//! minimum-length invariant.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;
use crate::utils::char_len;

/// Minimum number of characters a gospel text must have to be usable.
pub const MIN_TEXT_CHARS: usize = 50;

/// Reference shown when the passage citation could not be extracted.
pub const DEFAULT_REFERENCE: &str = "Evangelho do Dia";

/// A gospel reading ready for display.
///
/// The `text` carries embedded newlines and is meant for
/// whitespace-preserving rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGospelRecord")]
pub struct GospelRecord {
    reference: String,
    text: String,
}

/// Unvalidated shape used when deserializing configuration.
#[derive(Deserialize)]
struct RawGospelRecord {
    #[serde(default)]
    reference: Option<String>,
    text: String,
}

impl TryFrom<RawGospelRecord> for GospelRecord {
    type Error = ExtractionError;

    fn try_from(raw: RawGospelRecord) -> Result<Self, Self::Error> {
        GospelRecord::new(raw.reference.unwrap_or_default(), raw.text)
    }
}

impl GospelRecord {
    /// Build a record, rejecting texts shorter than [`MIN_TEXT_CHARS`].
    ///
    /// An empty `reference` is replaced with [`DEFAULT_REFERENCE`].
    ///
    /// # Arguments
    ///
    /// * `reference` - Passage citation, e.g. "Evangelho segundo São Lucas (Lc 11,42-46)"
    /// * `text` - Body text with its line breaks
    ///
    /// # Returns
    ///
    /// The record, or [`ExtractionError::TooShort`] with the character count.
    pub fn new(
        reference: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<Self, ExtractionError> {
        let text = text.into();
        let chars = char_len(&text);
        if chars < MIN_TEXT_CHARS {
            return Err(ExtractionError::TooShort { chars });
        }
        let reference = reference.into();
        let reference = if reference.trim().is_empty() {
            DEFAULT_REFERENCE.to_string()
        } else {
            reference
        };
        Ok(Self { reference, text })
    }

    /// Build a record from compiled-in text known to satisfy the invariant.
    pub(crate) fn from_static(reference: &str, text: &str) -> Self {
        Self {
            reference: reference.to_string(),
            text: text.to_string(),
        }
    }

    /// Human-readable passage citation. Never empty.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Body text, at least [`MIN_TEXT_CHARS`] characters.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the orchestrator accepts this record as a source result.
    pub fn is_substantial(&self) -> bool {
        char_len(&self.text) > MIN_TEXT_CHARS
    }
}

/// One liturgy site the resolver may query. Order in the registry is priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub url: String,
}

impl SourceDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Provenance of a resolved reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    /// Scraped from the named source.
    Source { name: String },
    /// Taken from the local fallback corpus.
    Fallback,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Source { name } => write!(f, "{name}"),
            Origin::Fallback => f.write_str("conteúdo local"),
        }
    }
}

/// The reading resolved for one local calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    /// Local calendar date, serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    pub record: GospelRecord,
    pub origin: Origin,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_text() -> String {
        "Naquele tempo, disse Jesus aos seus discípulos: amai-vos uns aos outros.".to_string()
    }

    #[test]
    fn test_record_rejects_short_text() {
        let err = GospelRecord::new("Jo 1,1-5", "curto demais").unwrap_err();
        assert!(matches!(err, ExtractionError::TooShort { chars: 12 }));
    }

    #[test]
    fn test_record_counts_characters_not_bytes() {
        // 49 two-byte characters: 98 bytes, still too short.
        let text = "ã".repeat(49);
        assert!(GospelRecord::new("", text).is_err());
        assert!(GospelRecord::new("", "ã".repeat(50)).is_ok());
    }

    #[test]
    fn test_record_defaults_reference() {
        let record = GospelRecord::new("  ", long_text()).unwrap();
        assert_eq!(record.reference(), DEFAULT_REFERENCE);
    }

    #[test]
    fn test_record_deserialization_enforces_invariant() {
        let ok: GospelRecord =
            serde_yaml::from_str(&format!("reference: Mt 5,1-12\ntext: \"{}\"", long_text()))
                .unwrap();
        assert_eq!(ok.reference(), "Mt 5,1-12");

        let bad = serde_yaml::from_str::<GospelRecord>("text: curto");
        assert!(bad.is_err());
    }

    #[test]
    fn test_substantial_requires_more_than_minimum() {
        let exact = GospelRecord::new("", "a".repeat(MIN_TEXT_CHARS)).unwrap();
        assert!(!exact.is_substantial());
        let more = GospelRecord::new("", "a".repeat(MIN_TEXT_CHARS + 1)).unwrap();
        assert!(more.is_substantial());
    }

    #[test]
    fn test_cache_entry_serialization() {
        let entry = CacheEntry {
            date: NaiveDate::from_ymd_opt(2026, 10, 14).unwrap(),
            record: GospelRecord::new("Lc 11,42-46", long_text()).unwrap(),
            origin: Origin::Source {
                name: "Canção Nova".to_string(),
            },
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"date\":\"2026-10-14\""));
        assert!(json.contains("\"kind\":\"source\""));
        assert!(json.contains("Canção Nova"));
    }
}
