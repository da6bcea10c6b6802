//! In-memory result cache.
//!
//! Keyed by (media type, normalised title, season, episode). Uses
//! [`moka`] so concurrent identical lookups share a single resolution.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::candidate::StreamCandidate;
use crate::request::{LookupRequest, MediaType};

/// Default maximum number of cached result sets.
pub const DEFAULT_CAPACITY: u64 = 256;

/// Composite cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    media_type: MediaType,
    /// Lowercased title with whitespace runs collapsed.
    title: String,
    season: Option<u32>,
    episode: Option<u32>,
}

impl CacheKey {
    pub fn new(request: &LookupRequest) -> Self {
        let title = request
            .title()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        Self {
            media_type: request.media_type(),
            title,
            season: request.season(),
            episode: request.episode_number(),
        }
    }
}

/// TTL-bounded cache of non-empty resolution results.
#[derive(Clone)]
pub struct ResultCache {
    inner: Cache<CacheKey, Arc<Vec<StreamCandidate>>>,
}

impl ResultCache {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            inner: Cache::builder().max_capacity(capacity).time_to_live(ttl).build(),
        }
    }

    /// Return the cached result for `request` or run `init`.
    ///
    /// `init` yields the candidates and whether the resolution completed.
    /// Concurrent callers with the same key wait on one `init`. Empty or
    /// incomplete results are returned but not stored, so a transient
    /// outage or a deadline isn't remembered for the whole TTL.
    pub async fn get_or_resolve<F>(&self, request: &LookupRequest, init: F) -> Arc<Vec<StreamCandidate>>
    where
        F: Future<Output = (Vec<StreamCandidate>, bool)>,
    {
        let mut uncached = None;
        let found = self
            .inner
            .optionally_get_with(CacheKey::new(request), async {
                let (candidates, complete) = init.await;
                if complete && !candidates.is_empty() {
                    Some(Arc::new(candidates))
                } else {
                    uncached = Some(Arc::new(candidates));
                    None
                }
            })
            .await;
        found.or(uncached).unwrap_or_default()
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    pub async fn clear(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }
}
