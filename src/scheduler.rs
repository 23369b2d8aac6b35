//! Refresh scheduling for the daily cache.
//!
//! One state machine owns the next wake time. It wakes for whichever comes
//! first:
//!
//! | Trigger | When |
//! |---------|------|
//! | `Midnight` | local midnight plus a small offset, rescheduled after it fires |
//! | `Poll` | every `poll_interval`, as a safety net |
//! | `Foreground` / `ForceRefresh` | on demand, from [`SchedulerEvent`]s |
//!
//! Every trigger except `ForceRefresh` goes through
//! [`DailyCache::get_today_entry`], so a check on a cache that is already
//! valid for today is a no-op.

use std::ops::ControlFlow;
use std::time::Duration;

use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use crate::cache::DailyCache;
use crate::clock::Clock;
use crate::config::Settings;
use crate::outputs::PresentationSink;
use crate::scrapers::fetch::SourceFetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePolicy {
    pub poll_interval: Duration,
    /// Added to local midnight so the calendar date has surely rolled over.
    pub midnight_offset: Duration,
}

impl SchedulePolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            midnight_offset: settings.midnight_offset(),
        }
    }
}

/// Why the scheduler checked the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Poll,
    Midnight,
    Foreground,
    ForceRefresh,
}

impl Trigger {
    /// User-initiated checks always show the reading, even when unchanged.
    fn always_displays(self) -> bool {
        matches!(
            self,
            Trigger::Startup | Trigger::Foreground | Trigger::ForceRefresh
        )
    }
}

/// Events fed to [`Scheduler::run`] by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// The application regained the foreground.
    Foreground,
    /// The user asked for a fresh resolution.
    ForceRefresh,
    Shutdown,
}

/// The next timed wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wake {
    pub trigger: Trigger,
    pub at: NaiveDateTime,
    pub delay: Duration,
}

fn add_std(t: NaiveDateTime, d: Duration) -> NaiveDateTime {
    TimeDelta::from_std(d)
        .ok()
        .and_then(|delta| t.checked_add_signed(delta))
        .unwrap_or(NaiveDateTime::MAX)
}

/// The first local midnight strictly after `now`'s date, plus `offset`.
///
/// # Arguments
///
/// * `now` - Current local time
/// * `offset` - Delay past midnight, so the date has surely rolled over
///
/// # Returns
///
/// The wake time, or [`NaiveDateTime::MAX`] at the end of the calendar.
pub fn next_midnight(now: NaiveDateTime, offset: Duration) -> NaiveDateTime {
    now.date()
        .succ_opt()
        .map(|tomorrow| add_std(tomorrow.and_time(NaiveTime::MIN), offset))
        .unwrap_or(NaiveDateTime::MAX)
}

/// Drives a [`DailyCache`] and forwards results to a sink.
#[derive(Debug)]
pub struct Scheduler<'a, F, C, S> {
    cache: &'a DailyCache<F, C>,
    sink: S,
    policy: SchedulePolicy,
    next_midnight: NaiveDateTime,
    next_poll: NaiveDateTime,
}

impl<'a, F: SourceFetcher, C: Clock, S: PresentationSink> Scheduler<'a, F, C, S> {
    /// A scheduler with both timers armed relative to the cache clock.
    ///
    /// # Arguments
    ///
    /// * `cache` - The cache every trigger goes through
    /// * `sink` - Receives readings and errors
    /// * `policy` - Poll interval and midnight offset
    pub fn new(cache: &'a DailyCache<F, C>, sink: S, policy: SchedulePolicy) -> Self {
        let now = cache.clock().now();
        Self {
            cache,
            sink,
            policy,
            next_midnight: next_midnight(now, policy.midnight_offset),
            next_poll: add_std(now, policy.poll_interval),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Which timer fires next, seen from `now`. Midnight wins ties.
    pub fn plan(&self, now: NaiveDateTime) -> Wake {
        let (trigger, at) = if self.next_midnight <= self.next_poll {
            (Trigger::Midnight, self.next_midnight)
        } else {
            (Trigger::Poll, self.next_poll)
        };
        let delay = (at - now).to_std().unwrap_or(Duration::ZERO);
        Wake { trigger, at, delay }
    }

    /// Check the cache for `trigger`, display the outcome, and move the
    /// timers past the current time.
    #[instrument(level = "info", skip(self))]
    pub async fn handle(&mut self, trigger: Trigger) {
        let before = self.cache.resolution_count();
        let result = match trigger {
            Trigger::ForceRefresh => self.cache.force_refresh().await,
            _ => self.cache.get_today_entry().await,
        };

        match result {
            Ok(entry) => {
                let resolved = self.cache.resolution_count() != before;
                if resolved || trigger.always_displays() {
                    self.sink.display(&entry);
                } else {
                    debug!(date = %entry.date, "Cache already current; nothing to show");
                }
            }
            Err(e) => {
                error!(error = %e, "Could not obtain today's gospel");
                self.sink.display_error(&e);
            }
        }

        self.reschedule(trigger);
    }

    fn reschedule(&mut self, trigger: Trigger) {
        let now = self.cache.clock().now();
        if now >= self.next_midnight {
            self.next_midnight = next_midnight(now, self.policy.midnight_offset);
            info!(next = %self.next_midnight, "Scheduled next midnight check");
        }
        if trigger == Trigger::Poll || now >= self.next_poll {
            self.next_poll = add_std(now, self.policy.poll_interval);
        }
    }

    /// Handle `trigger` while still listening for events.
    ///
    /// A [`SchedulerEvent::Shutdown`] drops the in-flight check, which leaves
    /// the cache as it was before. Other events are remembered and returned
    /// so the caller can run them next (a forced refresh wins over a
    /// foreground check).
    async fn handle_until_shutdown(
        &mut self,
        trigger: Trigger,
        events: &mut mpsc::Receiver<SchedulerEvent>,
    ) -> ControlFlow<(), Option<Trigger>> {
        let mut queued = None;
        let mut open = true;
        let handling = self.handle(trigger);
        tokio::pin!(handling);

        loop {
            tokio::select! {
                biased;
                () = &mut handling => return ControlFlow::Continue(queued),
                event = events.recv(), if open => match event {
                    Some(SchedulerEvent::Shutdown) => {
                        info!(?trigger, "Shutdown requested; abandoning check");
                        return ControlFlow::Break(());
                    }
                    Some(SchedulerEvent::ForceRefresh) => queued = Some(Trigger::ForceRefresh),
                    Some(SchedulerEvent::Foreground) => {
                        queued.get_or_insert(Trigger::Foreground);
                    }
                    None => open = false,
                },
            }
        }
    }

    /// Run until [`SchedulerEvent::Shutdown`] arrives or every sender is
    /// dropped. Returns the sink.
    ///
    /// Shutdown is honoured immediately, also while a resolution is running.
    pub async fn run(mut self, mut events: mpsc::Receiver<SchedulerEvent>) -> S {
        let mut next = Some(Trigger::Startup);
        loop {
            if let Some(trigger) = next.take() {
                match self.handle_until_shutdown(trigger, &mut events).await {
                    ControlFlow::Continue(queued) => next = queued,
                    ControlFlow::Break(()) => break,
                }
                continue;
            }

            let wake = self.plan(self.cache.clock().now());
            debug!(
                trigger = ?wake.trigger,
                at = %wake.at,
                delay_secs = wake.delay.as_secs(),
                "Sleeping"
            );

            tokio::select! {
                _ = tokio::time::sleep(wake.delay) => next = Some(wake.trigger),
                event = events.recv() => match event {
                    Some(SchedulerEvent::Foreground) => next = Some(Trigger::Foreground),
                    Some(SchedulerEvent::ForceRefresh) => next = Some(Trigger::ForceRefresh),
                    Some(SchedulerEvent::Shutdown) | None => break,
                },
            }
        }
        info!("Scheduler stopping");
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStatus;
    use crate::clock::ManualClock;
    use crate::error::{GospelError, SourceUnavailableError};
    use crate::fallback::FallbackCorpus;
    use crate::models::{CacheEntry, GospelRecord, Origin, SourceDescriptor};
    use crate::pipeline::Resolver;
    use crate::pipeline::testing::{BODY, ScriptedFetcher, sources};
    use chrono::NaiveDate;

    #[derive(Debug, Default)]
    struct RecordingSink {
        shown: Vec<CacheEntry>,
        errors: usize,
    }

    impl PresentationSink for RecordingSink {
        fn display(&mut self, entry: &CacheEntry) {
            self.shown.push(entry.clone());
        }

        fn display_error(&mut self, _error: &GospelError) {
            self.errors += 1;
        }
    }

    /// Never answers.
    struct StalledFetcher;

    impl SourceFetcher for StalledFetcher {
        async fn fetch(
            &self,
            _source: &SourceDescriptor,
        ) -> Result<GospelRecord, SourceUnavailableError> {
            std::future::pending().await
        }
    }

    fn at(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, d)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn policy() -> SchedulePolicy {
        SchedulePolicy {
            poll_interval: Duration::from_secs(15 * 60),
            midnight_offset: Duration::from_secs(5),
        }
    }

    fn cache(
        corpus: FallbackCorpus,
        now: NaiveDateTime,
    ) -> DailyCache<ScriptedFetcher, ManualClock> {
        let resolver = Resolver::new(
            ScriptedFetcher::failing().serving("one", BODY),
            sources(&["one"]),
            corpus,
        );
        DailyCache::new(resolver, ManualClock::new(now))
    }

    #[test]
    fn test_next_midnight() {
        let offset = Duration::from_secs(5);
        assert_eq!(next_midnight(at(14, 23, 59, 58), offset), at(15, 0, 0, 5));
        assert_eq!(next_midnight(at(15, 0, 0, 3), offset), at(16, 0, 0, 5));
        // Month boundary.
        let november = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
        assert_eq!(
            next_midnight(at(31, 12, 0, 0), Duration::ZERO),
            november.and_time(NaiveTime::MIN)
        );
    }

    #[test]
    fn test_plan_picks_earliest_timer() {
        let late = cache(FallbackCorpus::builtin(), at(14, 23, 50, 0));
        let scheduler = Scheduler::new(&late, RecordingSink::default(), policy());
        let wake = scheduler.plan(at(14, 23, 50, 0));
        assert_eq!(wake.trigger, Trigger::Midnight);
        assert_eq!(wake.delay, Duration::from_secs(10 * 60 + 5));

        let morning = cache(FallbackCorpus::builtin(), at(14, 9, 0, 0));
        let scheduler = Scheduler::new(&morning, RecordingSink::default(), policy());
        let wake = scheduler.plan(at(14, 9, 0, 0));
        assert_eq!(wake.trigger, Trigger::Poll);
        assert_eq!(wake.at, at(14, 9, 15, 0));
    }

    #[test]
    fn test_overdue_wake_has_zero_delay() {
        let cache = cache(FallbackCorpus::builtin(), at(14, 9, 0, 0));
        let scheduler = Scheduler::new(&cache, RecordingSink::default(), policy());
        assert_eq!(scheduler.plan(at(14, 10, 0, 0)).delay, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_midnight_crossing_resolves_for_new_day() {
        let cache = cache(FallbackCorpus::builtin(), at(14, 23, 59, 58));
        let mut scheduler = Scheduler::new(&cache, RecordingSink::default(), policy());

        scheduler.handle(Trigger::Startup).await;
        let yesterday = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        assert_eq!(cache.status().await, CacheStatus::Valid(yesterday));

        let wake = scheduler.plan(cache.clock().now());
        assert_eq!(wake.trigger, Trigger::Midnight);
        cache.clock().set(wake.at);
        scheduler.handle(wake.trigger).await;

        let today = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        assert_eq!(cache.status().await, CacheStatus::Valid(today));
        assert_eq!(cache.resolution_count(), 2);

        let shown: Vec<_> = scheduler.sink().shown.iter().map(|e| e.date).collect();
        assert_eq!(shown, vec![yesterday, today]);
        assert_eq!(
            scheduler.sink().shown[1].origin,
            Origin::Source {
                name: "one".to_string()
            }
        );

        // The midnight timer moved on to the following night.
        let next = scheduler.plan(cache.clock().now());
        assert_eq!(next.trigger, Trigger::Poll);
        assert_eq!(scheduler.next_midnight, at(16, 0, 0, 5));
    }

    #[tokio::test]
    async fn test_polls_on_a_valid_cache_are_silent() {
        let cache = cache(FallbackCorpus::builtin(), at(14, 9, 0, 0));
        let mut scheduler = Scheduler::new(&cache, RecordingSink::default(), policy());

        scheduler.handle(Trigger::Startup).await;
        for _ in 0..3 {
            cache.clock().advance(TimeDelta::minutes(15));
            scheduler.handle(Trigger::Poll).await;
        }

        assert_eq!(cache.resolution_count(), 1);
        assert_eq!(scheduler.sink().shown.len(), 1);
        assert_eq!(cache.resolver().fetcher().calls(), vec!["one"]);
    }

    #[tokio::test]
    async fn test_foreground_shows_without_resolving() {
        let cache = cache(FallbackCorpus::builtin(), at(14, 9, 0, 0));
        let mut scheduler = Scheduler::new(&cache, RecordingSink::default(), policy());

        scheduler.handle(Trigger::Startup).await;
        scheduler.handle(Trigger::Foreground).await;

        assert_eq!(cache.resolution_count(), 1);
        assert_eq!(scheduler.sink().shown.len(), 2);
    }

    #[tokio::test]
    async fn test_errors_reach_the_sink() {
        let resolver = Resolver::new(
            ScriptedFetcher::failing(),
            sources(&["one"]),
            FallbackCorpus::new(Vec::new()),
        );
        let cache = DailyCache::new(resolver, ManualClock::new(at(14, 9, 0, 0)));
        let mut scheduler = Scheduler::new(&cache, RecordingSink::default(), policy());

        scheduler.handle(Trigger::Startup).await;
        assert_eq!(scheduler.sink().errors, 1);
        assert!(scheduler.sink().shown.is_empty());
    }

    #[tokio::test]
    async fn test_run_handles_events_until_shutdown() {
        let cache = cache(FallbackCorpus::builtin(), at(14, 9, 0, 0));
        let scheduler = Scheduler::new(&cache, RecordingSink::default(), policy());
        let (tx, rx) = mpsc::channel(4);

        let driver = async {
            while cache.resolution_count() < 1 {
                tokio::task::yield_now().await;
            }
            tx.send(SchedulerEvent::ForceRefresh).await.unwrap();
            while cache.resolution_count() < 2 {
                tokio::task::yield_now().await;
            }
            tx.send(SchedulerEvent::Shutdown).await.unwrap();
        };

        let (sink, ()) = tokio::join!(scheduler.run(rx), driver);
        assert_eq!(sink.shown.len(), 2);
        assert_eq!(cache.resolution_count(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_a_stalled_resolution() {
        let resolver = Resolver::new(
            StalledFetcher,
            sources(&["slow"]),
            FallbackCorpus::builtin(),
        );
        let cache = DailyCache::new(resolver, ManualClock::new(at(14, 9, 0, 0)));
        let scheduler = Scheduler::new(&cache, RecordingSink::default(), policy());

        let (tx, rx) = mpsc::channel(1);
        tx.send(SchedulerEvent::Shutdown).await.unwrap();

        let sink = tokio::time::timeout(Duration::from_secs(5), scheduler.run(rx))
            .await
            .expect("scheduler kept waiting on the stalled source");
        assert!(sink.shown.is_empty());
        assert_eq!(sink.errors, 0);
        assert_eq!(cache.status().await, CacheStatus::Empty);
        assert_eq!(cache.resolution_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_requested_mid_check_runs_afterwards() {
        let cache = cache(FallbackCorpus::builtin(), at(14, 9, 0, 0));
        let scheduler = Scheduler::new(&cache, RecordingSink::default(), policy());

        let (tx, rx) = mpsc::channel(1);
        tx.send(SchedulerEvent::ForceRefresh).await.unwrap();
        drop(tx);

        let sink = scheduler.run(rx).await;
        assert_eq!(sink.shown.len(), 2);
        assert_eq!(cache.resolution_count(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_when_senders_are_dropped() {
        let cache = cache(FallbackCorpus::builtin(), at(14, 9, 0, 0));
        let scheduler = Scheduler::new(&cache, RecordingSink::default(), policy());

        let (tx, rx) = mpsc::channel::<SchedulerEvent>(1);
        drop(tx);

        let sink = scheduler.run(rx).await;
        assert_eq!(sink.shown.len(), 1);
    }
}
