//! # Daily Gospel
//!
//! Shows the gospel reading of the day, scraped from Portuguese-language
//! liturgy sites with a built-in corpus as the last resort.
//!
//! ## Usage
//!
//! ```sh
//! daily_gospel              # run: show and keep current, `r` + Enter refreshes
//! daily_gospel once         # print once and exit
//! daily_gospel probe        # diagnose sources
//! ```

use std::error::Error;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

use daily_gospel::cli::{Cli, Command};
use daily_gospel::clock::Clock;
use daily_gospel::outputs::PresentationSink;
use daily_gospel::outputs::console::{ConsoleSink, RetryHint};
use daily_gospel::outputs::json::JsonSink;
use daily_gospel::probe::{FallbackLine, probe_sources, render_report};
use daily_gospel::scheduler::{SchedulePolicy, Scheduler, SchedulerEvent};
use daily_gospel::utils::truncate_for_log;
use daily_gospel::{DailyCache, HttpFetcher, Resolver, Settings, SystemClock};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init (stderr, so stdout stays clean for readings) ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply_overrides(&mut settings);
    settings.validate()?;

    let fetcher = HttpFetcher::new(&settings)?;

    match args.command() {
        Command::Probe => {
            let lines = probe_sources(&fetcher, &settings.sources).await;
            let fallback = FallbackLine::for_date(&settings.corpus(), SystemClock.today());
            for line in render_report(&lines, &fallback, args.json) {
                println!("{line}");
            }
            Ok(())
        }
        Command::Once => {
            let cache = build_cache(fetcher, &settings);
            once(&cache, build_sink(args.json, RetryHint::Rerun)).await
        }
        Command::Run => {
            let cache = build_cache(fetcher, &settings);
            let sink = build_sink(args.json, RetryHint::Interactive);
            run(&cache, sink, SchedulePolicy::from_settings(&settings)).await;
            Ok(())
        }
    }
}

fn build_sink(json: bool, hint: RetryHint) -> Box<dyn PresentationSink> {
    if json {
        Box::new(JsonSink::new(std::io::stdout()))
    } else {
        Box::new(ConsoleSink::with_hint(std::io::stdout(), hint))
    }
}

fn build_cache(fetcher: HttpFetcher, settings: &Settings) -> DailyCache<HttpFetcher, SystemClock> {
    let resolver = Resolver::new(fetcher, settings.sources.clone(), settings.corpus());
    DailyCache::new(resolver, SystemClock)
}

async fn once(
    cache: &DailyCache<HttpFetcher, SystemClock>,
    mut sink: Box<dyn PresentationSink>,
) -> Result<(), Box<dyn Error>> {
    match cache.get_today_entry().await {
        Ok(entry) => {
            sink.display(&entry);
            Ok(())
        }
        Err(e) => {
            sink.display_error(&e);
            Err(e.into())
        }
    }
}

#[instrument(level = "info", skip_all)]
async fn run(
    cache: &DailyCache<HttpFetcher, SystemClock>,
    sink: Box<dyn PresentationSink>,
    policy: SchedulePolicy,
) {
    let (tx, rx) = mpsc::channel(8);

    // stdin: `r` forces a refresh, an empty line re-checks like a foreground event.
    let stdin_tx = tx.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let event = match line.trim() {
                "" => SchedulerEvent::Foreground,
                "r" | "R" => SchedulerEvent::ForceRefresh,
                "q" | "Q" => SchedulerEvent::Shutdown,
                other => {
                    debug!(input = %truncate_for_log(other, 40), "Ignoring unknown command");
                    continue;
                }
            };
            if stdin_tx.send(event).await.is_err() {
                break;
            }
        }
        debug!("stdin closed");
    });

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(SchedulerEvent::Shutdown).await;
            }
            Err(e) => warn!(error = %e, "Could not listen for Ctrl-C"),
        }
    });

    info!(
        poll_secs = policy.poll_interval.as_secs(),
        midnight_offset_secs = policy.midnight_offset.as_secs(),
        "Scheduler starting"
    );
    Scheduler::new(cache, sink, policy).run(rx).await;
}
