// src/fetch/limiter.rs
// =============================================================================
// Per-origin request gate.
//
// The course API rate-limits aggressively, so traversal fetches hold a permit
// from a per-origin semaphore for the whole request. With the default
// capacity of 1 there is never more than one API request in flight per
// origin. Downloads from file hosts do not go through this gate.
// =============================================================================

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;
use url::Url;

use crate::error::{ArchiveError, Result};

#[derive(Debug)]
pub struct OriginLimiter {
    per_origin: usize,
    gates: DashMap<String, Arc<Semaphore>>,
}

impl OriginLimiter {
    /// `per_origin` is clamped to at least 1.
    pub fn new(per_origin: usize) -> Self {
        Self {
            per_origin: per_origin.max(1),
            gates: DashMap::new(),
        }
    }

    /// Waits for a request slot on the URL's origin. The slot is released
    /// when the returned permit is dropped.
    pub async fn acquire(&self, url: &str) -> Result<OwnedSemaphorePermit> {
        let origin = origin_of(url);

        // Clone the Arc out so the map shard isn't locked across the await
        let gate = self
            .gates
            .entry(origin.clone())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_origin)))
            .clone();

        trace!(%origin, available = gate.available_permits(), "waiting for request slot");
        gate.acquire_owned()
            .await
            .map_err(|_| ArchiveError::GateClosed { origin })
    }
}

// scheme://host[:port]; unparseable URLs get a gate of their own
fn origin_of(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.origin().ascii_serialization(),
        Err(_) => url.to_string(),
    }
}
