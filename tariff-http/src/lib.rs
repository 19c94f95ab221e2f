//! Minimal HTTP client for non-rendered documents.
//!
//! - Reachability probe ([`HttpClient::check`]) run before a page is rendered
//! - Plain document fetch ([`HttpClient::get_text`]) for static pages such as
//!   the combo promotion
//! - Single attempt per request: a failed status or connection error is
//!   returned as is
//! - Redacts sensitive query params in logs
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), tariff_http::HttpError> {
//! let client = tariff_http::HttpClient::new()?;
//! let url = url::Url::parse("https://mobilevikings.be/en/offer/combo/").unwrap();
//! let html = client.get_text(&url, tariff_http::RequestOpts::default()).await?;
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response status and errors.

use reqwest::header::{HeaderMap, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tariff_common::ScrapeError;
use thiserror::Error;
use url::Url;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },
    #[error("decode error for {url}: {message}")]
    Decode { url: String, message: String },
    #[error("{url} returned {status}: {message}")]
    Api {
        url: String,
        status: StatusCode,
        message: String,
    },
}

impl From<HttpError> for ScrapeError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Build(message) => ScrapeError::Config(message),
            HttpError::Network { url, message } | HttpError::Decode { url, message } => {
                ScrapeError::Network { url, message }
            }
            HttpError::Api {
                url,
                status,
                message,
            } => ScrapeError::Network {
                url,
                message: format!("HTTP {status}: {message}"),
            },
        }
    }
}

// ==============================
// Request Options
// ==============================

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use tariff_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// assert!(opts.headers.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts {
    pub timeout: Option<Duration>,
    pub headers: Option<HeaderMap>,
}

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    pub default_timeout: Duration,
}

impl HttpClient {
    /// Construct a client with a browser-like user agent.
    ///
    /// ```no_run
    /// use tariff_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new()?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new() -> Result<Self, HttpError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, DEFAULT_USER_AGENT.parse().map_err(|e| {
            HttpError::Build(format!("invalid user agent: {e}"))
        })?);
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .default_headers(headers)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            inner,
            default_timeout: Duration::from_secs(15),
        })
    }

    /// Override the default timeout returned by [`HttpClient::new`].
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// GET `url` and return the body as text.
    pub async fn get_text(&self, url: &Url, opts: RequestOpts) -> Result<String, HttpError> {
        let body = self.get_internal(url, &opts).await?;
        String::from_utf8(body).map_err(|e| HttpError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Succeeds when `url` answers a GET with a success status.
    pub async fn check(&self, url: &Url) -> Result<(), HttpError> {
        self.get_internal(url, &RequestOpts::default()).await?;
        tracing::debug!(host_path = %host_path(url), "http.check.ok");
        Ok(())
    }

    // ==============================
    // Core request implementation
    // ==============================

    /// One attempt. Failures surface immediately; re-running is the caller's
    /// scheduler's business.
    async fn get_internal(&self, url: &Url, opts: &RequestOpts) -> Result<Vec<u8>, HttpError> {
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let mut rb = self.inner.get(url.clone()).timeout(timeout);
        if let Some(hdrs) = &opts.headers {
            rb = rb.headers(hdrs.clone());
        }

        tracing::debug!(
            host_path=%host_path(url),
            query=?redact_query(url),
            timeout_ms=timeout.as_millis() as u64,
            "http.request.start"
        );

        let t0 = Instant::now();
        let resp = rb.send().await.map_err(|err| {
            tracing::warn!(host_path=%host_path(url), error=%err, "http.network_error");
            HttpError::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        })?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| HttpError::Network {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!(
            %status,
            elapsed_ms=t0.elapsed().as_millis() as u64,
            body_len=bytes.len(),
            "http.response"
        );

        if status.is_success() {
            return Ok(bytes.to_vec());
        }

        let snippet = snip_body(&bytes);
        tracing::warn!(host_path=%host_path(url), %status, body_snippet=%snippet, "http.error");
        Err(HttpError::Api {
            url: url.to_string(),
            status,
            message: snippet,
        })
    }
}

// ==============================
// Helpers
// ==============================

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > 500 {
        let mut cut = 500;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}

fn host_path(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or("-"), url.path())
}

fn redact_query(url: &Url) -> Vec<(String, String)> {
    url.query_pairs()
        .map(|(k, v)| {
            let is_secret = matches!(
                k.to_ascii_lowercase().as_str(),
                "access_token" | "auth" | "key" | "api_key" | "token" | "secret"
            );
            (
                k.to_string(),
                if is_secret {
                    "<redacted>".into()
                } else {
                    v.to_string()
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_redacted() {
        let url = Url::parse("https://example.test/p?token=abc&page=2").unwrap();
        let q = redact_query(&url);
        assert_eq!(q[0], ("token".to_string(), "<redacted>".to_string()));
        assert_eq!(q[1], ("page".to_string(), "2".to_string()));
    }

    #[test]
    fn api_error_maps_to_network() {
        let err: ScrapeError = HttpError::Api {
            url: "https://example.test".into(),
            status: StatusCode::NOT_FOUND,
            message: "gone".into(),
        }
        .into();
        assert_eq!(err.kind(), "network");
        assert!(err.to_string().contains("404"));
    }
}
