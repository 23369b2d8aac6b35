//! Source orchestration: the "first success" combinator and the resolver.
//!
//! Sources are tried strictly one after another in registry order. A source
//! failure is logged and moves resolution on to the next source; when every
//! source has failed, the fallback corpus answers. Network trouble never
//! reaches the caller.

use std::future::Future;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::error::{GospelError, SourceUnavailableError};
use crate::fallback::FallbackCorpus;
use crate::models::{GospelRecord, Origin, SourceDescriptor};
use crate::scrapers::fetch::SourceFetcher;
use crate::utils::char_len;

/// Run `attempt` on each candidate in order and return the first success.
///
/// Candidates after the first success are never attempted. On exhaustion,
/// returns every candidate paired with its error, in attempt order.
pub async fn first_success<I, T, E, F, Fut>(
    candidates: I,
    mut attempt: F,
) -> Result<T, Vec<(I::Item, E)>>
where
    I: IntoIterator,
    I::Item: Clone,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut failures = Vec::new();
    for candidate in candidates {
        match attempt(candidate.clone()).await {
            Ok(value) => return Ok(value),
            Err(e) => failures.push((candidate, e)),
        }
    }
    Err(failures)
}

/// Why a single source did not produce today's reading.
#[derive(Debug, thiserror::Error)]
enum SourceFailure {
    #[error(transparent)]
    Unavailable(#[from] SourceUnavailableError),
    #[error("record from {source_name} rejected: only {chars} characters")]
    Rejected { source_name: String, chars: usize },
}

/// A resolved reading together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub record: GospelRecord,
    pub origin: Origin,
}

/// Walks the source registry, falling back to the offline corpus.
#[derive(Debug)]
pub struct Resolver<F> {
    fetcher: F,
    sources: Vec<SourceDescriptor>,
    corpus: FallbackCorpus,
}

impl<F: SourceFetcher> Resolver<F> {
    /// Create a resolver over a registry.
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Retrieves and extracts one source
    /// * `sources` - Registry in priority order; may be empty
    /// * `corpus` - Offline passages used when no source succeeds
    pub fn new(fetcher: F, sources: Vec<SourceDescriptor>, corpus: FallbackCorpus) -> Self {
        Self {
            fetcher,
            sources,
            corpus,
        }
    }

    /// The registry, highest priority first.
    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    /// The fallback corpus.
    pub fn corpus(&self) -> &FallbackCorpus {
        &self.corpus
    }

    /// The underlying fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Resolve the reading for `today`.
    ///
    /// # Errors
    ///
    /// Only [`GospelError::EmptyCorpus`], when every source failed and the
    /// fallback corpus has nothing to offer.
    #[instrument(level = "info", skip(self), fields(sources = self.sources.len()))]
    pub async fn resolve_today(&self, today: NaiveDate) -> Result<Resolution, GospelError> {
        let t0 = Instant::now();
        let outcome = first_success(&self.sources, |source| async move {
            let record = self.fetcher.fetch(source).await?;
            if record.is_substantial() {
                Ok::<_, SourceFailure>((source, record))
            } else {
                Err(SourceFailure::Rejected {
                    source_name: source.name.clone(),
                    chars: char_len(record.text()),
                })
            }
        })
        .await;

        match outcome {
            Ok((source, record)) => {
                info!(
                    source = %source.name,
                    reference = %record.reference(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Resolved gospel from source"
                );
                Ok(Resolution {
                    record,
                    origin: Origin::Source {
                        name: source.name.clone(),
                    },
                })
            }
            Err(failures) => {
                for (source, failure) in &failures {
                    warn!(source = %source.name, error = %failure, "Source failed");
                }
                let record = self.corpus.for_date(today)?.clone();
                warn!(
                    %today,
                    failed_sources = failures.len(),
                    reference = %record.reference(),
                    "All sources failed; using fallback corpus"
                );
                Ok(Resolution {
                    record,
                    origin: Origin::Fallback,
                })
            }
        }
    }
}
