//! Error types for source resolution.
//!
//! Two layers: [`ResolveError`] is what callers of the resolver see, and
//! [`ProviderError`] is what a single provider lookup can fail with. Provider
//! errors never cross the provider boundary; they are logged and turned into
//! "no candidate" by [`SourceProvider::resolve`](crate::provider::SourceProvider::resolve).

/// Errors surfaced by the resolver to its caller.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The lookup request is missing a required field or is malformed.
    /// Raised before any provider is invoked.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The orchestration itself faulted (not a provider failure).
    #[error("resolution failed: {0}")]
    Internal(String),
}

impl ResolveError {
    /// HTTP status code the boundary adapter maps this error to.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Human-readable message without the variant prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidRequest(msg) | Self::Internal(msg) => msg,
        }
    }

    /// Stable machine-readable code for the error body.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Failures inside a single provider lookup.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Transport-level failure (DNS, connect, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The target answered with a non-2xx status.
    #[error("unexpected status {0}")]
    Status(u16),

    /// The response could not be parsed (HTML, JSON, URL template).
    #[error("parse error: {0}")]
    Parse(String),

    /// Headless browser launch, navigation or teardown failed.
    #[error("browser error: {0}")]
    Browser(String),

    /// A bounded operation exceeded its time limit.
    #[error("timed out after {0}s")]
    Timeout(u64),

    /// The shared deadline fired or the resolver shut down.
    #[error("cancelled")]
    Cancelled,

    /// The provider has nothing for this title (empty search, no episodes).
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return Self::Status(status.as_u16());
        }
        if e.is_decode() {
            return Self::Parse(e.to_string());
        }
        Self::Http(e.to_string())
    }
}

/// Convenience alias for resolver-facing results.
pub type Result<T> = std::result::Result<T, ResolveError>;
