//! Settings: built-in defaults, optionally overridden by a YAML file.
//!
//! ```yaml
//! # every key is optional
//! request_timeout_secs: 8
//! poll_interval_secs: 900
//! midnight_offset_secs: 5
//! proxy_base: https://api.allorigins.win/get
//! sources:
//!   - name: Canção Nova
//!     url: https://liturgia.cancaonova.com/pb/
//! fallback:
//!   - reference: Evangelho segundo São João (Jo 14,1-6)
//!     text: "Naquele tempo, disse Jesus aos seus discípulos: ..."
//! ```

use std::path::Path;
use std::time::Duration;

use itertools::Itertools;
use serde::Deserialize;
use tracing::{info, instrument};
use url::Url;

use crate::error::ConfigError;
use crate::fallback::FallbackCorpus;
use crate::models::{GospelRecord, SourceDescriptor};
use crate::scrapers::{DEFAULT_PROXY_BASE, default_sources};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

fn default_request_timeout_secs() -> u64 {
    8
}

/// Safety-net re-check interval (15 minutes).
fn default_poll_interval_secs() -> u64 {
    15 * 60
}

/// Delay after local midnight before the rollover check fires.
fn default_midnight_offset_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Liturgy sources in priority order.
    pub sources: Vec<SourceDescriptor>,
    pub proxy_base: String,
    pub user_agent: String,
    pub accept: String,
    pub request_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub midnight_offset_secs: u64,
    /// Replaces the built-in corpus when present.
    pub fallback: Option<Vec<GospelRecord>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            proxy_base: DEFAULT_PROXY_BASE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            midnight_offset_secs: default_midnight_offset_secs(),
            fallback: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or the defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            info!("No config file given; using built-in settings");
            return Ok(Self::default());
        };
        let shown = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: shown.clone(),
            source,
        })?;
        let settings = Self::from_yaml(&raw).map_err(|e| match e {
            ConfigError::Yaml { source, .. } => ConfigError::Yaml {
                path: shown.clone(),
                source,
            },
            other => other,
        })?;
        info!(
            path = %shown,
            sources = settings.sources.len(),
            "Loaded configuration"
        );
        Ok(settings)
    }

    /// Parse and validate settings from a YAML document.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        // An empty file means "all defaults".
        let settings: Settings = if raw.trim().is_empty() {
            Settings::default()
        } else {
            serde_yaml::from_str(raw).map_err(|source| ConfigError::Yaml {
                path: "<inline>".to_string(),
                source,
            })?
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for source in &self.sources {
            parse_absolute(&source.url)
                .map_err(|e| ConfigError::Invalid(format!("source {}: {e}", source.name)))?;
        }
        if let Some(dup) = self.sources.iter().duplicates_by(|s| s.url.clone()).next() {
            return Err(ConfigError::Invalid(format!(
                "source URL {} is listed more than once",
                dup.url
            )));
        }
        parse_absolute(&self.proxy_base)
            .map_err(|e| ConfigError::Invalid(format!("proxy_base: {e}")))?;

        for (key, value) in [
            ("request_timeout_secs", self.request_timeout_secs),
            ("poll_interval_secs", self.poll_interval_secs),
            ("midnight_offset_secs", self.midnight_offset_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{key} must be greater than zero")));
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn midnight_offset(&self) -> Duration {
        Duration::from_secs(self.midnight_offset_secs)
    }

    /// The configured corpus, or the built-in one.
    pub fn corpus(&self) -> FallbackCorpus {
        match &self.fallback {
            Some(entries) => FallbackCorpus::new(entries.clone()),
            None => FallbackCorpus::builtin(),
        }
    }
}

fn parse_absolute(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid URL {raw:?}: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme {other:?} in {raw}")),
    }
}
