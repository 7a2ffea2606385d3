//! HTTP network capability.
//!
//! ### Single attempt
//! - One request per fetch, no retries
//! - Non-2xx answers are returned as responses, never as errors
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//! - Timeout: 20s (configurable)
//!
//! ### Error mapping
//! - Timeouts become `FETCH_TIMEOUT`
//! - Refused or unreachable connections become `OFFLINE`
//! - Anything else at the transport level becomes `NETWORK_ERROR`

mod offline;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;

pub use offline::OfflineNetwork;

use swcache_core::{AppConfig, Error, Network, Request, Response};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "swcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(app: &AppConfig) -> Self {
        Self {
            user_agent: app.user_agent.clone(),
            max_bytes: app.max_bytes,
            timeout: app.timeout(),
            max_redirects: app.max_redirects,
        }
    }
}

/// reqwest-backed [`Network`].
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn too_large(&self, len: u64) -> Error {
        Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.as_str())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| transport_error(&request.url, &e))?;

        let status = response.status();
        if let Some(len) = response.content_length()
            && len > self.config.max_bytes as u64
        {
            return Err(self.too_large(len));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let body = response.bytes().await.map_err(|e| transport_error(&request.url, &e))?;
        if body.len() > self.config.max_bytes {
            return Err(self.too_large(body.len() as u64));
        }

        tracing::debug!(
            "fetched {} -> {} [{}] in {}ms ({} bytes)",
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response { url: final_url, status, headers, body })
    }
}

fn transport_error(url: &url::Url, e: &reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::FetchTimeout(format!("{url}: {e}"))
    } else if e.is_connect() {
        Error::Offline(format!("{url}: {e}"))
    } else {
        Error::Network(format!("{url}: {e}"))
    }
}
