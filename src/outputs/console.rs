//! Plain-text console rendering.

use std::io::Write;

use chrono::{Locale, NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::warn;

use crate::error::GospelError;
use crate::models::CacheEntry;
use crate::outputs::PresentationSink;

/// Long Brazilian-Portuguese date, e.g. `quarta, 14 de outubro de 2026`.
pub fn long_date_pt_br(date: NaiveDate) -> String {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
        .format_localized("%A, %-d de %B de %Y", Locale::pt_BR)
        .to_string()
}

/// Full text block for one reading.
pub fn render_entry(entry: &CacheEntry) -> String {
    format!(
        "📖 Evangelho do dia · {}\n\n{}\n\n{}\n\n(fonte: {})\n",
        long_date_pt_br(entry.date),
        entry.record.reference(),
        entry.record.text(),
        entry.origin
    )
}

/// How the user can retry after an error, which depends on how the program
/// was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryHint {
    /// Interactive `run` mode reads commands from stdin.
    #[default]
    Interactive,
    /// One-shot mode exits; the user runs the command again.
    Rerun,
}

impl RetryHint {
    fn text(self) -> &'static str {
        match self {
            RetryHint::Interactive => "digite r e Enter para tentar novamente",
            RetryHint::Rerun => "execute o comando novamente",
        }
    }
}

/// Error block shown in place of a reading.
///
/// # Arguments
///
/// * `error` - The failure to report
/// * `hint` - Which retry instruction fits the current mode
///
/// # Returns
///
/// A newline-terminated block with the error and the retry instruction.
pub fn render_error(error: &GospelError, hint: RetryHint) -> String {
    format!(
        "⚠️ Erro ao carregar o evangelho: {error}\n\
         Verifique a configuração e {}.\n",
        hint.text()
    )
}

/// Writes readings to any `Write`, normally stdout.
#[derive(Debug)]
pub struct ConsoleSink<W> {
    out: W,
    hint: RetryHint,
}

impl<W: Write> ConsoleSink<W> {
    /// A sink for interactive mode.
    pub fn new(out: W) -> Self {
        Self::with_hint(out, RetryHint::Interactive)
    }

    pub fn with_hint(out: W, hint: RetryHint) -> Self {
        Self { out, hint }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, block: &str) {
        let written = self
            .out
            .write_all(block.as_bytes())
            .and_then(|_| self.out.flush());
        if let Err(e) = written {
            warn!(error = %e, "Failed writing to console");
        }
    }
}

impl<W: Write> PresentationSink for ConsoleSink<W> {
    fn display(&mut self, entry: &CacheEntry) {
        self.emit(&render_entry(entry));
    }

    fn display_error(&mut self, error: &GospelError) {
        self.emit(&render_error(error, self.hint));
    }
}
