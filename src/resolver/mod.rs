//! Multi-provider source resolution.
//!
//! The [`Resolver`] owns the ordered provider list and runs one of two
//! policies over it:
//!
//! - [`Policy::Parallel`]: every provider is started before any is awaited,
//!   results are concatenated in provider priority order
//! - [`Policy::Fallback`]: providers run one at a time; the first non-empty
//!   normalized result ends the search
//!
//! Provider failures never surface here. A per-call deadline cancels the
//! remaining providers and returns whatever has been collected.

pub mod cache;

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::candidate::{normalize, StreamCandidate};
use crate::error::Result;
use crate::http_client::cancellable;
use crate::provider::SourceProvider;
use crate::request::{LookupRequest, SourceQuery};

pub use cache::ResultCache;

/// Execution policy over the provider list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Query every provider concurrently.
    #[default]
    Parallel,
    /// Query providers in order until one produces a candidate.
    Fallback,
}

impl Policy {
    pub fn as_str(self) -> &'static str {
        match self {
            Policy::Parallel => "parallel",
            Policy::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parallel" | "all" => Ok(Policy::Parallel),
            "fallback" | "sequential" => Ok(Policy::Fallback),
            other => Err(format!("unknown policy {other:?} (expected parallel or fallback)")),
        }
    }
}

/// Aborts the deadline timer when the call finishes or is dropped.
struct Deadline(Option<JoinHandle<()>>);

impl Deadline {
    fn arm(timeout: Option<Duration>, token: &CancellationToken) -> Self {
        Self(timeout.map(|timeout| {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                debug!(timeout_ms = millis(timeout), "request deadline reached");
                token.cancel();
            })
        }))
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

/// Source-resolution orchestrator.
pub struct Resolver {
    providers: Vec<Arc<dyn SourceProvider>>,
    policy: Policy,
    request_timeout: Option<Duration>,
    root: CancellationToken,
    cache: Option<ResultCache>,
}

impl Resolver {
    /// Providers are queried in the order given.
    pub fn new(providers: Vec<Arc<dyn SourceProvider>>, policy: Policy) -> Self {
        Self {
            providers,
            policy,
            request_timeout: None,
            root: CancellationToken::new(),
            cache: None,
        }
    }

    /// Cancel outstanding providers once a call has run for `timeout`.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }

    /// Validate a raw query and resolve it.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidRequest`](crate::ResolveError::InvalidRequest)
    /// without contacting any provider when the query is malformed.
    pub async fn resolve_query(&self, query: SourceQuery) -> Result<Vec<StreamCandidate>> {
        let request = query.into_request()?;
        Ok(self.resolve(&request).await)
    }

    /// Resolve a validated request. An empty result means no provider
    /// produced a usable candidate.
    #[instrument(skip(self, request), fields(request = %request, policy = %self.policy))]
    pub async fn resolve(&self, request: &LookupRequest) -> Vec<StreamCandidate> {
        match &self.cache {
            Some(cache) => cache.get_or_resolve(request, self.run(request)).await.as_ref().clone(),
            None => self.run(request).await.0,
        }
    }

    /// Cancel every in-flight call. Later calls return no candidates.
    pub fn shutdown(&self) {
        info!("resolver shutting down");
        self.root.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Returns the candidates and whether every provider ran to completion
    /// (false after the deadline or a shutdown).
    async fn run(&self, request: &LookupRequest) -> (Vec<StreamCandidate>, bool) {
        let started = Instant::now();
        let token = self.root.child_token();
        let _deadline = Deadline::arm(self.request_timeout, &token);

        let candidates = match self.policy {
            Policy::Parallel => self.run_parallel(request, &token).await,
            Policy::Fallback => self.run_fallback(request, &token).await,
        };

        let complete = !token.is_cancelled();
        info!(
            count = candidates.len(),
            elapsed_ms = millis(started.elapsed()),
            complete,
            "resolution finished"
        );
        (candidates, complete)
    }

    async fn run_parallel(&self, request: &LookupRequest, token: &CancellationToken) -> Vec<StreamCandidate> {
        let futures: Vec<_> = self
            .providers
            .iter()
            .map(|provider| query_provider(provider.as_ref(), request, token))
            .collect();

        let outcomes = join_all(futures).await;
        normalize(outcomes.into_iter().flatten())
    }

    async fn run_fallback(&self, request: &LookupRequest, token: &CancellationToken) -> Vec<StreamCandidate> {
        for provider in &self.providers {
            if token.is_cancelled() {
                debug!(provider = provider.name(), "deadline passed, skipping remaining providers");
                break;
            }
            let found = query_provider(provider.as_ref(), request, token).await;
            if !found.is_empty() {
                debug!(provider = provider.name(), count = found.len(), "fallback satisfied");
                return found;
            }
        }
        Vec::new()
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("providers", &self.provider_names())
            .field("policy", &self.policy)
            .field("request_timeout", &self.request_timeout)
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Run one provider under the call token and normalize its output.
///
/// A panicking provider is contained here and counts as no candidate.
async fn query_provider(
    provider: &dyn SourceProvider,
    request: &LookupRequest,
    token: &CancellationToken,
) -> Vec<StreamCandidate> {
    let outcome = AssertUnwindSafe(cancellable(token, provider.resolve(request, token)))
        .catch_unwind()
        .await;
    match outcome {
        Ok(Ok(found)) => normalize(found),
        Ok(Err(e)) => {
            warn!(provider = provider.name(), error = %e, "provider abandoned");
            Vec::new()
        }
        Err(panic) => {
            warn!(provider = provider.name(), panic = panic_message(panic.as_ref()), "provider panicked");
            Vec::new()
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parses_aliases() {
        assert_eq!("parallel".parse::<Policy>().unwrap(), Policy::Parallel);
        assert_eq!("Sequential".parse::<Policy>().unwrap(), Policy::Fallback);
        assert_eq!(" fallback ".parse::<Policy>().unwrap(), Policy::Fallback);
        assert!("race".parse::<Policy>().is_err());
    }

    #[test]
    fn policy_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Policy::Fallback).unwrap(), r#""fallback""#);
        let p: Policy = serde_json::from_str(r#""parallel""#).unwrap();
        assert_eq!(p, Policy::Parallel);
    }

    #[tokio::test]
    async fn empty_provider_list_resolves_to_nothing() {
        let resolver = Resolver::new(Vec::new(), Policy::Parallel);
        let request = LookupRequest::movie("Inception").unwrap();
        assert!(resolver.resolve(&request).await.is_empty());
    }

    #[test]
    fn millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn panic_message_reads_common_payloads() {
        let s: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(s.as_ref()), "boom");
        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(owned.as_ref()), "owned boom");
        let other: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }

    #[tokio::test]
    async fn shutdown_is_observable() {
        let resolver = Resolver::new(Vec::new(), Policy::Fallback);
        assert!(!resolver.is_shut_down());
        resolver.shutdown();
        assert!(resolver.is_shut_down());
    }
}
