//! Day-keyed cache in front of the resolver.
//!
//! # States
//!
//! | State | Meaning |
//! |-------|---------|
//! | `Empty` | nothing resolved yet, or cleared by a forced refresh |
//! | `Valid(d)` | holds the reading for local date `d` |
//! | `Stale(d)` | holds a reading for `d`, but today is not `d`; resolution pending |
//!
//! The state lives behind an async mutex that is held for the whole
//! resolution, so concurrent callers queue behind an in-flight resolution
//! and then read its result instead of starting their own.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::clock::Clock;
use crate::error::GospelError;
use crate::models::{CacheEntry, GospelRecord};
use crate::pipeline::Resolver;
use crate::scrapers::fetch::SourceFetcher;

/// Observable cache state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Empty,
    Valid(NaiveDate),
    Stale(NaiveDate),
}

#[derive(Debug, Default)]
enum CacheState {
    #[default]
    Empty,
    Valid(CacheEntry),
    Stale(CacheEntry),
}

impl CacheState {
    fn status(&self) -> CacheStatus {
        match self {
            CacheState::Empty => CacheStatus::Empty,
            CacheState::Valid(entry) => CacheStatus::Valid(entry.date),
            CacheState::Stale(entry) => CacheStatus::Stale(entry.date),
        }
    }
}

/// Process-wide holder of today's reading.
#[derive(Debug)]
pub struct DailyCache<F, C> {
    resolver: Resolver<F>,
    clock: C,
    state: Mutex<CacheState>,
    resolutions: AtomicU64,
}

impl<F: SourceFetcher, C: Clock> DailyCache<F, C> {
    /// An empty cache. Nothing is resolved until the first request.
    ///
    /// # Arguments
    ///
    /// * `resolver` - Produces a reading when the cache is not valid for today
    /// * `clock` - Decides what "today" is
    pub fn new(resolver: Resolver<F>, clock: C) -> Self {
        Self {
            resolver,
            clock,
            state: Mutex::new(CacheState::Empty),
            resolutions: AtomicU64::new(0),
        }
    }

    /// The clock that decides what "today" is.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The resolver behind cache misses.
    pub fn resolver(&self) -> &Resolver<F> {
        &self.resolver
    }

    /// Number of completed resolutions since creation.
    pub fn resolution_count(&self) -> u64 {
        self.resolutions.load(Ordering::Acquire)
    }

    pub async fn status(&self) -> CacheStatus {
        self.state.lock().await.status()
    }

    /// The cached entry, if it is valid for today.
    pub async fn current_entry(&self) -> Option<CacheEntry> {
        let today = self.clock.today();
        match &*self.state.lock().await {
            CacheState::Valid(entry) if entry.date == today => Some(entry.clone()),
            _ => None,
        }
    }

    /// Today's reading. Served from cache without network activity when the
    /// cache is valid for today; resolved (and cached) otherwise.
    ///
    /// # Errors
    ///
    /// [`GospelError`] when resolution fails outright (empty fallback corpus).
    pub async fn get_today(&self) -> Result<GospelRecord, GospelError> {
        Ok(self.get_today_entry().await?.record)
    }

    /// Like [`DailyCache::get_today`], returning the full entry.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_today_entry(&self) -> Result<CacheEntry, GospelError> {
        let mut state = self.state.lock().await;
        let today = self.clock.today();

        if let CacheState::Valid(entry) = &*state {
            if entry.date == today {
                debug!(%today, "Serving cached gospel");
                return Ok(entry.clone());
            }
        }
        *state = match std::mem::take(&mut *state) {
            CacheState::Valid(entry) => {
                info!(cached = %entry.date, %today, "Cached gospel is stale");
                CacheState::Stale(entry)
            }
            other => other,
        };

        self.resolve_into(&mut state, today).await
    }

    /// Discard the cache and resolve again.
    ///
    /// A refresh that had to wait for another resolution to finish reuses
    /// that result instead of resolving a second time.
    #[instrument(level = "info", skip(self))]
    pub async fn force_refresh(&self) -> Result<CacheEntry, GospelError> {
        let seen = self.resolution_count();
        let mut state = self.state.lock().await;
        let today = self.clock.today();

        if self.resolution_count() != seen {
            if let CacheState::Valid(entry) = &*state {
                if entry.date == today {
                    debug!("Refresh coalesced with a resolution that just finished");
                    return Ok(entry.clone());
                }
            }
        }

        info!(%today, "Forced refresh; clearing cache");
        *state = CacheState::Empty;
        self.resolve_into(&mut state, today).await
    }

    async fn resolve_into(
        &self,
        state: &mut CacheState,
        today: NaiveDate,
    ) -> Result<CacheEntry, GospelError> {
        let resolution = self.resolver.resolve_today(today).await?;
        let entry = CacheEntry {
            date: today,
            record: resolution.record,
            origin: resolution.origin,
        };
        *state = CacheState::Valid(entry.clone());
        self.resolutions.fetch_add(1, Ordering::AcqRel);
        info!(%today, origin = %entry.origin, "Cached gospel for today");
        Ok(entry)
    }
}
