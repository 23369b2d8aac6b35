//! Error taxonomy for the gospel pipeline.
//!
//! Single-source failures ([`NetworkError`], [`ProxyError`],
//! [`ExtractionError`], aggregated into [`SourceUnavailableError`]) never
//! reach callers of the resolver: they only move resolution on to the next
//! source or strategy. [`GospelError`] is the one caller-visible failure and
//! signals a misconfigured installation.

use itertools::Itertools;
use thiserror::Error;

use crate::scrapers::fetch::Strategy;

/// Failure to retrieve a page over HTTP.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Failure specific to the CORS-proxy strategy.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("proxy request failed: {0}")]
    Network(#[from] NetworkError),
    #[error("proxy envelope for {url} is malformed: {reason}")]
    MalformedEnvelope { url: String, reason: String },
}

/// The page was retrieved but no usable gospel text was found in it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no gospel text found in page")]
    NotFound,
    #[error("gospel text too short ({chars} characters)")]
    TooShort { chars: usize },
}

/// What went wrong during one strategy attempt against one source.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Proxy(#[from] ProxyError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Every strategy failed for one source.
#[derive(Debug, Error)]
#[error("source {source_name} unavailable: {}", describe_attempts(.attempts))]
pub struct SourceUnavailableError {
    pub source_name: String,
    pub attempts: Vec<(Strategy, AttemptError)>,
}

fn describe_attempts(attempts: &[(Strategy, AttemptError)]) -> String {
    if attempts.is_empty() {
        return "no strategy attempted".to_string();
    }
    attempts
        .iter()
        .map(|(strategy, err)| format!("{strategy}: {err}"))
        .join("; ")
}

/// Caller-visible failure of the pipeline. Retrying is allowed but will not
/// succeed until the configuration is fixed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GospelError {
    #[error("the fallback gospel corpus is empty")]
    EmptyCorpus,
}

/// Invalid or unreadable settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
