//! Page retrieval for a single liturgy source.
//!
//! Each source is tried with an ordered list of [`Strategy`] values: a
//! direct request with browser-like headers, then the same page through a
//! CORS proxy that wraps it in a `{ "contents": "<html>" }` envelope. The
//! first strategy whose page yields a usable reading wins.
//!
//! # Architecture
//!
//! - [`SourceFetcher`]: the seam the resolver depends on
//! - [`HttpFetcher`]: the `reqwest` implementation used in production

use std::fmt;
use std::future::Future;
use std::time::Instant;

use reqwest::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::Settings;
use crate::error::{AttemptError, ConfigError, NetworkError, ProxyError, SourceUnavailableError};
use crate::models::{GospelRecord, SourceDescriptor};
use crate::pipeline::first_success;
use crate::scrapers::extract::extract;

/// How a source page is retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Plain GET of the source URL.
    Direct,
    /// GET through the CORS proxy.
    Proxy,
}

impl Strategy {
    /// Order in which strategies are attempted for every source.
    pub const ORDER: [Strategy; 2] = [Strategy::Direct, Strategy::Proxy];
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Direct => "direct",
            Strategy::Proxy => "proxy",
        })
    }
}

/// Retrieves and extracts the reading offered by one source.
///
/// Implementors must try every strategy they support before giving up, and
/// only return records that passed extraction.
pub trait SourceFetcher {
    /// Fetch the gospel of the day from `source`.
    ///
    /// # Errors
    ///
    /// [`SourceUnavailableError`] listing each failed strategy.
    fn fetch(
        &self,
        source: &SourceDescriptor,
    ) -> impl Future<Output = Result<GospelRecord, SourceUnavailableError>> + Send;
}

/// Proxy response body. Only `contents` is used.
#[derive(Debug, Deserialize)]
struct ProxyEnvelope {
    contents: Option<String>,
}

/// `reqwest`-backed [`SourceFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    proxy_base: String,
    user_agent: String,
    accept: String,
}

impl HttpFetcher {
    /// Build a fetcher whose every request is bounded by `settings.request_timeout()`.
    pub fn new(settings: &Settings) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .connect_timeout(settings.request_timeout())
            .build()
            .map_err(|e| ConfigError::Invalid(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            proxy_base: settings.proxy_base.clone(),
            user_agent: settings.user_agent.clone(),
            accept: settings.accept.clone(),
        })
    }

    /// Proxy URL wrapping `target`: `<proxy_base>?url=<url-encoded target>`.
    pub fn proxy_url(&self, target: &str) -> String {
        let separator = if self.proxy_base.contains('?') {
            '&'
        } else {
            '?'
        };
        format!(
            "{}{}url={}",
            self.proxy_base,
            separator,
            urlencoding::encode(target)
        )
    }

    /// Run one strategy against one source, extraction included.
    #[instrument(level = "info", skip_all, fields(source = %source.name, %strategy))]
    pub async fn attempt(
        &self,
        source: &SourceDescriptor,
        strategy: Strategy,
    ) -> Result<GospelRecord, AttemptError> {
        let t0 = Instant::now();
        let html = match strategy {
            Strategy::Direct => self.fetch_direct(&source.url).await?,
            Strategy::Proxy => self.fetch_via_proxy(&source.url).await?,
        };
        let record = extract(&html)?;
        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            reference = %record.reference(),
            "Extracted gospel from source"
        );
        Ok(record)
    }

    /// GET `url` with browser-like headers and return the body.
    pub async fn fetch_direct(&self, url: &str) -> Result<String, NetworkError> {
        let request = self
            .client
            .get(url)
            .header(ACCEPT, &self.accept)
            .header(USER_AGENT, &self.user_agent);
        Self::read_body(url, request).await
    }

    /// GET `url` through the CORS proxy and unwrap the envelope.
    pub async fn fetch_via_proxy(&self, url: &str) -> Result<String, ProxyError> {
        let proxy_url = self.proxy_url(url);
        debug!(%proxy_url, "Trying proxy");
        let body = Self::read_body(&proxy_url, self.client.get(&proxy_url)).await?;

        let envelope: ProxyEnvelope =
            serde_json::from_str(&body).map_err(|e| ProxyError::MalformedEnvelope {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        match envelope.contents {
            Some(contents) if !contents.trim().is_empty() => Ok(contents),
            _ => Err(ProxyError::MalformedEnvelope {
                url: url.to_string(),
                reason: "missing or empty `contents`".to_string(),
            }),
        }
    }

    async fn read_body(
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<String, NetworkError> {
        let transport = |source| NetworkError::Transport {
            url: url.to_string(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(transport)
    }
}

impl SourceFetcher for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(source = %source.name))]
    async fn fetch(
        &self,
        source: &SourceDescriptor,
    ) -> Result<GospelRecord, SourceUnavailableError> {
        first_success(Strategy::ORDER, |strategy| async move {
            let t0 = Instant::now();
            let result = self.attempt(source, strategy).await;
            if let Err(e) = &result {
                warn!(
                    source = %source.name,
                    %strategy,
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    error = %e,
                    "Strategy failed"
                );
            }
            result
        })
        .await
        .map_err(|attempts| SourceUnavailableError {
            source_name: source.name.clone(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = "<html><body><h2>Evangelho (Lc 11,42-46)</h2>\
        <p>Naquele tempo, disse o Senhor: Ai de vós, fariseus, porque pagais o dízimo da hortelã, \
        da arruda e de todas as outras ervas, mas deixais de lado a justiça e o amor de Deus.</p>\
        <p>Palavra da Salvação.</p></body></html>";

    fn fetcher_for(server: &MockServer) -> HttpFetcher {
        let settings = Settings {
            proxy_base: format!("{}/get", server.uri()),
            ..Settings::default()
        };
        HttpFetcher::new(&settings).unwrap()
    }

    fn source_at(server: &MockServer) -> SourceDescriptor {
        SourceDescriptor::new("Local", format!("{}/liturgia", server.uri()))
    }

    #[test]
    fn test_fetch_future_is_send() {
        fn assert_send<T: Send>(_: &T) {}
        let fetcher = HttpFetcher::new(&Settings::default()).unwrap();
        let source = SourceDescriptor::new("Local", "http://127.0.0.1:9/");
        let future = fetcher.fetch(&source);
        assert_send(&future);
    }

    #[test]
    fn test_proxy_url_encodes_target() {
        let settings = Settings::default();
        let fetcher = HttpFetcher::new(&settings).unwrap();
        assert_eq!(
            fetcher.proxy_url("https://liturgia.cancaonova.com/pb/"),
            "https://api.allorigins.win/get?url=https%3A%2F%2Fliturgia.cancaonova.com%2Fpb%2F"
        );
    }

    #[tokio::test]
    async fn test_direct_fetch_sends_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/liturgia"))
            .and(header("user-agent", Settings::default().user_agent.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let record = fetcher_for(&server).fetch(&source_at(&server)).await.unwrap();
        assert_eq!(record.reference(), "Evangelho segundo São Lucas (Lc 11,42-46)");
    }

    #[tokio::test]
    async fn test_falls_back_to_proxy_on_http_error() {
        let server = MockServer::start().await;
        let source = source_at(&server);
        Mock::given(method("GET"))
            .and(path("/liturgia"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .and(query_param("url", source.url.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "contents": PAGE, "status": {} })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let record = fetcher_for(&server).fetch(&source).await.unwrap();
        assert!(record.text().starts_with("Naquele tempo"));
    }

    #[tokio::test]
    async fn test_falls_back_to_proxy_when_page_has_no_gospel() {
        let server = MockServer::start().await;
        let source = source_at(&server);
        Mock::given(method("GET"))
            .and(path("/liturgia"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body>Aguarde</body></html>"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "contents": PAGE })),
            )
            .mount(&server)
            .await;

        assert!(fetcher_for(&server).fetch(&source).await.is_ok());
    }

    #[tokio::test]
    async fn test_reports_every_failed_strategy() {
        let server = MockServer::start().await;
        let source = source_at(&server);
        Mock::given(method("GET"))
            .and(path("/liturgia"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = fetcher_for(&server).fetch(&source).await.unwrap_err();
        assert_eq!(err.source_name, "Local");
        assert_eq!(err.attempts.len(), 2);
        assert!(matches!(
            err.attempts[0],
            (Strategy::Direct, AttemptError::Network(NetworkError::Status { status: 500, .. }))
        ));
        assert!(matches!(
            err.attempts[1],
            (Strategy::Proxy, AttemptError::Proxy(ProxyError::MalformedEnvelope { .. }))
        ));
    }

    #[tokio::test]
    async fn test_proxy_envelope_without_contents_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "contents": null })),
            )
            .mount(&server)
            .await;

        let err = fetcher_for(&server)
            .fetch_via_proxy("https://example.org/liturgia")
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::MalformedEnvelope { .. }));
    }

    #[tokio::test]
    async fn test_stalled_source_times_out_and_uses_proxy() {
        let server = MockServer::start().await;
        let source = source_at(&server);
        Mock::given(method("GET"))
            .and(path("/liturgia"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(PAGE)
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "contents": PAGE })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let settings = Settings {
            proxy_base: format!("{}/get", server.uri()),
            request_timeout_secs: 1,
            ..Settings::default()
        };
        let fetcher = HttpFetcher::new(&settings).unwrap();

        let t0 = Instant::now();
        let record = fetcher.fetch(&source).await.unwrap();
        let elapsed = t0.elapsed();

        assert!(record.text().starts_with("Naquele tempo"));
        assert!(elapsed >= Duration::from_secs(1), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(10), "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_stalled_direct_fetch_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let settings = Settings {
            request_timeout_secs: 1,
            ..Settings::default()
        };
        let fetcher = HttpFetcher::new(&settings).unwrap();
        let err = fetcher
            .fetch_direct(&format!("{}/liturgia", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::Transport { ref source, .. } if source.is_timeout()));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_transport_error() {
        let settings = Settings {
            request_timeout_secs: 1,
            ..Settings::default()
        };
        let fetcher = HttpFetcher::new(&settings).unwrap();
        let err = fetcher.fetch_direct("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, NetworkError::Transport { .. }));
    }
}
