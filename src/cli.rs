//! Command-line interface definitions for Daily Gospel.
//!
//! Flags override values from the YAML settings file. The config path can
//! also be provided through the `DAILY_GOSPEL_CONFIG` environment variable.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;

/// Command-line arguments for the Daily Gospel application.
///
/// # Examples
///
/// ```sh
/// # Keep today's gospel on screen, refreshing after midnight
/// daily_gospel
///
/// # Print once as JSON and exit
/// daily_gospel --json once
///
/// # Check which sources are reachable right now
/// daily_gospel --timeout-secs 4 probe
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long, env = "DAILY_GOSPEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// CORS/relay proxy endpoint used when a direct fetch fails
    #[arg(long)]
    pub proxy_base: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Safety-net re-check interval in seconds
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,

    /// Emit JSON lines instead of formatted text
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Show today's gospel and keep it current (default)
    Run,
    /// Resolve today's gospel once, print it, and exit
    Once,
    /// Try every source and strategy and report what works
    Probe,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }

    /// Apply command-line overrides on top of loaded settings.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(proxy_base) = &self.proxy_base {
            settings.proxy_base = proxy_base.clone();
        }
        if let Some(secs) = self.timeout_secs {
            settings.request_timeout_secs = secs;
        }
        if let Some(secs) = self.poll_interval_secs {
            settings.poll_interval_secs = secs;
        }
    }
}
