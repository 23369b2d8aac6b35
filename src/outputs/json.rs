//! JSON rendering for scripts and other programs.
//!
//! # Output Shape
//!
//! ```text
//! {"date":"2026-10-14","reference":"...","text":"...","origin":{"kind":"source","name":"Canção Nova"}}
//! {"error":"the fallback gospel corpus is empty","retryable":true}
//! ```

use std::io::Write;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::GospelError;
use crate::models::{CacheEntry, Origin};
use crate::outputs::PresentationSink;

#[derive(Serialize)]
struct EntryLine<'a> {
    date: NaiveDate,
    reference: &'a str,
    text: &'a str,
    origin: &'a Origin,
}

impl<'a> From<&'a CacheEntry> for EntryLine<'a> {
    fn from(entry: &'a CacheEntry) -> Self {
        Self {
            date: entry.date,
            reference: entry.record.reference(),
            text: entry.record.text(),
            origin: &entry.origin,
        }
    }
}

#[derive(Serialize)]
struct ErrorLine<'a> {
    error: &'a str,
    retryable: bool,
}

/// One JSON object per line.
#[derive(Debug)]
pub struct JsonSink<W> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit<T: Serialize>(&mut self, value: &T) {
        let line = match serde_json::to_string(value) {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "Failed to serialize JSON output");
                return;
            }
        };
        if let Err(e) = writeln!(self.out, "{line}").and_then(|_| self.out.flush()) {
            warn!(error = %e, "Failed writing JSON output");
        }
    }
}

impl<W: Write> PresentationSink for JsonSink<W> {
    fn display(&mut self, entry: &CacheEntry) {
        self.emit(&EntryLine::from(entry));
    }

    fn display_error(&mut self, error: &GospelError) {
        let message = error.to_string();
        self.emit(&ErrorLine {
            error: &message,
            retryable: true,
        });
    }
}
