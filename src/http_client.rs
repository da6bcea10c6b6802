//! Shared HTTP client for provider lookups
//!
//! Features:
//! - Browser fingerprint headers on every request
//! - Connection pooling with keep-alive, shared by all providers
//! - Brotli, Zstd, Gzip compression (auto-negotiated)
//! - Cookie store (some embed pages set a session cookie on the first hit)
//! - Every request races a [`CancellationToken`]

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::error::ProviderError;
use crate::fingerprint::{random_profile, BrowserProfile};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client with fingerprinting and cancellation
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    profile: BrowserProfile,
}

impl HttpClient {
    /// Create a client with a random desktop profile
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_profile(random_profile(), DEFAULT_TIMEOUT)
    }

    /// Create client with specific browser profile and request timeout
    pub fn with_profile(profile: BrowserProfile, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            // Let servers negotiate; embed hosts are a mix of h1 and h2
            .http2_adaptive_window(true)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .zstd(true)
            .gzip(true)
            .deflate(true)
            .default_headers(profile.to_headers())
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .cookie_store(true)
            .build()
            .map_err(|e| ProviderError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, profile })
    }

    /// Send a GET and return the response if it is 2xx.
    #[instrument(skip(self, cancel), fields(url = %url))]
    pub async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Response, ProviderError> {
        debug!("fetching");
        let response = cancellable(cancel, self.client.get(url).send()).await??;
        let status = response.status();
        debug!(status = %status, version = ?response.version(), "response received");

        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }
        Ok(response)
    }

    /// Fetch and return body as string
    pub async fn fetch_text(&self, url: &str, cancel: &CancellationToken) -> Result<String, ProviderError> {
        let response = self.get(url, cancel).await?;
        Ok(cancellable(cancel, response.text()).await??)
    }

    /// Fetch and decode a JSON body
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<T, ProviderError> {
        let response = self.get(url, cancel).await?;
        let bytes = cancellable(cancel, response.bytes()).await??;
        serde_json::from_slice(&bytes).map_err(|e| ProviderError::Parse(format!("invalid JSON from {url}: {e}")))
    }

    /// Browser profile attached to every request.
    pub fn profile(&self) -> &BrowserProfile {
        &self.profile
    }

    /// Get the underlying reqwest client
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Run `fut` unless `cancel` fires first.
pub async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output, ProviderError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ProviderError::Cancelled),
        out = fut => Ok(out),
    }
}
