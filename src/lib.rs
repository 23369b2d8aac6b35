//! # Daily Gospel
//!
//! Fetches the gospel reading of the day from Portuguese-language liturgy
//! sites and keeps it current across local midnight.
//!
//! ## Architecture
//!
//! 1. **Scrapers**: fetch a source page directly, or through a relay proxy,
//!    and extract the reference and body text from its HTML
//! 2. **Pipeline**: try sources in priority order, falling back to a built-in
//!    corpus keyed by date when none yields a reading
//! 3. **Cache**: hold the reading for today's date and coalesce concurrent
//!    requests into one resolution
//! 4. **Scheduler**: re-check at startup, at local midnight, on a polling
//!    interval, and on demand
//! 5. **Outputs**: render readings as text or JSON
//!
//! ```no_run
//! use daily_gospel::{DailyCache, HttpFetcher, Resolver, Settings, SystemClock};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::default();
//! let resolver = Resolver::new(
//!     HttpFetcher::new(&settings)?,
//!     settings.sources.clone(),
//!     settings.corpus(),
//! );
//! let cache = DailyCache::new(resolver, SystemClock);
//! let gospel = cache.get_today().await?;
//! println!("{}\n\n{}", gospel.reference(), gospel.text());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod fallback;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod probe;
pub mod scheduler;
pub mod scrapers;
pub mod utils;

pub use cache::{CacheStatus, DailyCache};
pub use clock::{Clock, SystemClock};
pub use config::Settings;
pub use error::GospelError;
pub use models::{CacheEntry, GospelRecord, Origin, SourceDescriptor};
pub use pipeline::{Resolution, Resolver};
pub use scrapers::fetch::{HttpFetcher, SourceFetcher, Strategy};
