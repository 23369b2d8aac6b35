//! Presentation of resolved readings.
//!
//! The pipeline hands every reading (and every caller-visible error) to a
//! [`PresentationSink`]. Two sinks ship with the crate:
//!
//! - [`console`]: human-readable text with a Portuguese date header
//! - [`json`]: one JSON object per line, for scripts

pub mod console;
pub mod json;

use crate::error::GospelError;
use crate::models::CacheEntry;

/// Receives what the scheduler wants shown.
pub trait PresentationSink {
    /// Show a resolved reading. `entry.record.text()` contains newlines and
    /// must be rendered with whitespace preserved.
    fn display(&mut self, entry: &CacheEntry);

    /// Show a failure the user can retry.
    fn display_error(&mut self, error: &GospelError);
}

impl<S: PresentationSink + ?Sized> PresentationSink for Box<S> {
    fn display(&mut self, entry: &CacheEntry) {
        (**self).display(entry);
    }

    fn display_error(&mut self, error: &GospelError) {
        (**self).display_error(error);
    }
}
