//! Connectivity diagnostics for the source registry.
//!
//! Every source is tried with every [`Strategy`] independently, so the
//! report shows which routes work right now. Network trouble is reported,
//! never raised.
//!
//! # Output
//!
//! ```text
//! ok   Canção Nova    direct Evangelho segundo São Lucas (Lc 11,42-46) (812 chars)
//! FAIL CNBB           proxy  proxy envelope for https://... is malformed: ...
//! fallback for 2026-10-14: Evangelho segundo São João (Jo 3,16-21)
//! ```
//!
//! With `--json` every line, the fallback summary included, is a JSON object.

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::fallback::FallbackCorpus;
use crate::models::SourceDescriptor;
use crate::scrapers::fetch::{HttpFetcher, Strategy};
use crate::utils::char_len;

/// Outcome of one strategy against one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeLine {
    pub source: String,
    pub strategy: Strategy,
    pub ok: bool,
    /// Reference and length on success, the error otherwise.
    pub detail: String,
}

/// The fallback passage that would be shown today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackLine {
    pub fallback_date: NaiveDate,
    /// `None` when the corpus is empty.
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FallbackLine {
    /// Summarise what `corpus` offers for `date`.
    pub fn for_date(corpus: &FallbackCorpus, date: NaiveDate) -> Self {
        match corpus.for_date(date) {
            Ok(record) => Self {
                fallback_date: date,
                reference: Some(record.reference().to_string()),
                error: None,
            },
            Err(e) => Self {
                fallback_date: date,
                reference: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Try each source with each strategy, one request at a time.
///
/// # Arguments
///
/// * `fetcher` - The HTTP fetcher (timeouts and headers already configured)
/// * `sources` - Sources to test, in priority order
///
/// # Returns
///
/// One [`ProbeLine`] per source and strategy, in attempt order.
#[instrument(level = "info", skip_all, fields(sources = sources.len()))]
pub async fn probe_sources(fetcher: &HttpFetcher, sources: &[SourceDescriptor]) -> Vec<ProbeLine> {
    let pairs = sources
        .iter()
        .flat_map(|source| Strategy::ORDER.map(|strategy| (source, strategy)));

    let lines: Vec<ProbeLine> = stream::iter(pairs)
        .then(|(source, strategy)| async move {
            let (ok, detail) = match fetcher.attempt(source, strategy).await {
                Ok(record) => (
                    true,
                    format!("{} ({} chars)", record.reference(), char_len(record.text())),
                ),
                Err(e) => (false, e.to_string()),
            };
            ProbeLine {
                source: source.name.clone(),
                strategy,
                ok,
                detail,
            }
        })
        .collect()
        .await;

    let ok = lines.iter().filter(|l| l.ok).count();
    info!(attempts = lines.len(), ok, "Probe finished");
    lines
}

/// Render a probe report, one output line per entry.
///
/// # Arguments
///
/// * `lines` - Per-source results from [`probe_sources`]
/// * `fallback` - Today's fallback summary, always rendered last
/// * `json` - Emit JSON Lines instead of aligned text
///
/// # Returns
///
/// The lines to print, fallback summary last.
pub fn render_report(lines: &[ProbeLine], fallback: &FallbackLine, json: bool) -> Vec<String> {
    if json {
        let mut out: Vec<String> = lines.iter().filter_map(to_json).collect();
        out.extend(to_json(fallback));
        return out;
    }

    let mut out: Vec<String> = lines
        .iter()
        .map(|line| {
            let mark = if line.ok { "ok  " } else { "FAIL" };
            format!(
                "{mark} {:<14} {:<6} {}",
                line.source,
                line.strategy.to_string(),
                line.detail
            )
        })
        .collect();
    let summary = match (&fallback.reference, &fallback.error) {
        (Some(reference), _) => reference.clone(),
        (None, Some(e)) => format!("unavailable ({e})"),
        (None, None) => "unavailable".to_string(),
    };
    out.push(format!("fallback for {}: {summary}", fallback.fallback_date));
    out
}

fn to_json<T: Serialize>(value: &T) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(error = %e, "Failed to serialize probe line");
            None
        }
    }
}
