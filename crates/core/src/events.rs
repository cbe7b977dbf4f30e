//! Observer interface for pipeline outcomes.
//!
//! The pipeline never logs directly. It reports what happened to a
//! [`PipelineEvents`] implementation: [`TracingEvents`] in production,
//! [`EventLog`] when a test wants to assert on the sequence.

use std::sync::Mutex;

use crate::cache::CacheKey;

/// Callbacks invoked by the annotation pipeline. All methods default to no-ops.
pub trait PipelineEvents: Send + Sync {
    fn on_cache_hit(&self, _key: &CacheKey) {}

    /// A purge sweep ran and removed `deleted` stale entries.
    fn on_cache_purged(&self, _deleted: u64) {}

    /// A cache read, write or purge failed and was treated as a miss.
    fn on_cache_error(&self, _err: &crate::Error) {}

    /// The remote call failed; the input is returned unannotated.
    fn on_remote_error(&self, _err: &(dyn std::error::Error + Send + Sync)) {}

    /// The annotated text differs from the input outside of service anchors.
    fn on_integrity_failure(&self, _key: &CacheKey) {}
}

/// Reports events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEvents;

impl PipelineEvents for TracingEvents {
    fn on_cache_hit(&self, key: &CacheKey) {
        tracing::debug!(key = %key, "cache hit");
    }

    fn on_cache_purged(&self, deleted: u64) {
        tracing::info!(deleted, "cache purged");
    }

    fn on_cache_error(&self, err: &crate::Error) {
        tracing::warn!(error = %err, "cache unavailable, continuing without it");
    }

    fn on_remote_error(&self, err: &(dyn std::error::Error + Send + Sync)) {
        tracing::warn!(error = %err, "linking service call failed, returning input unchanged");
    }

    fn on_integrity_failure(&self, key: &CacheKey) {
        tracing::warn!(key = %key, "integrity check failed, returning input unchanged");
    }
}

/// One recorded pipeline event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    CacheHit(String),
    CachePurged(u64),
    CacheError(String),
    RemoteError(String),
    IntegrityFailure(String),
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    fn push(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl PipelineEvents for EventLog {
    fn on_cache_hit(&self, key: &CacheKey) {
        self.push(Event::CacheHit(key.to_string()));
    }

    fn on_cache_purged(&self, deleted: u64) {
        self.push(Event::CachePurged(deleted));
    }

    fn on_cache_error(&self, err: &crate::Error) {
        self.push(Event::CacheError(err.to_string()));
    }

    fn on_remote_error(&self, err: &(dyn std::error::Error + Send + Sync)) {
        self.push(Event::RemoteError(err.to_string()));
    }

    fn on_integrity_failure(&self, key: &CacheKey) {
        self.push(Event::IntegrityFailure(key.to_string()));
    }
}
