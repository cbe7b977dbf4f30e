//! TTL-gated fingerprint cache for annotated texts.
//!
//! Entries are keyed by [`CacheKey`] and carry an implicit age (file mtime or
//! a `written_at` column). Age is compared against the caller's TTL at read
//! time, so changing the TTL between calls changes expiry retroactively.
//!
//! - [`FileCache`]: one file per entry plus a `lastpurge` marker
//! - [`SqliteCache`]: the same semantics in a single SQLite database

pub mod connection;
pub mod files;
pub mod hash;
pub mod migrations;
pub mod sqlite;

pub use crate::Error;

pub use connection::CacheDb;
pub use files::FileCache;
pub use hash::{CacheKey, KeyDigest};
pub use sqlite::SqliteCache;

use async_trait::async_trait;

/// Stored in place of the output when the service returned the input unchanged.
pub const UNCHANGED_SENTINEL: &str = "<!--vernetzen:unchanged-->";

/// Name of the marker recording the last purge.
pub const PURGE_MARKER: &str = "lastpurge";

const SECONDS_PER_DAY: i64 = 86_400;

/// Unix timestamp before which entries are considered stale.
pub fn cutoff(ttl_days: u32) -> i64 {
    chrono::Utc::now().timestamp() - i64::from(ttl_days) * SECONDS_PER_DAY
}

/// Content-addressed store for annotation results.
#[async_trait]
pub trait FingerprintCache: Send + Sync {
    /// Key under which `text` is stored.
    fn key_for(&self, text: &str) -> CacheKey;

    /// Return the cached output for `text` if an entry younger than `ttl_days` exists.
    async fn read(&self, text: &str, ttl_days: u32) -> Result<Option<String>, Error>;

    /// Store `output` for `text`, replacing any previous entry.
    async fn write(&self, text: &str, output: &str) -> Result<(), Error>;

    /// Delete stale entries unless a purge already ran within `ttl_days`.
    ///
    /// Returns `None` when no purge was due, otherwise the number of deleted entries.
    async fn purge_if_due(&self, ttl_days: u32) -> Result<Option<u64>, Error>;
}

/// Payload to persist for `output`, using the sentinel when nothing changed.
pub(crate) fn encode_payload<'a>(text: &str, output: &'a str) -> &'a str {
    if output == text { UNCHANGED_SENTINEL } else { output }
}

/// Inverse of [`encode_payload`].
pub(crate) fn decode_payload(text: &str, payload: String) -> String {
    if payload == UNCHANGED_SENTINEL { text.to_string() } else { payload }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_uses_sentinel_for_unchanged_output() {
        assert_eq!(encode_payload("§ 1 BGB", "§ 1 BGB"), UNCHANGED_SENTINEL);
        assert_eq!(encode_payload("§ 1 BGB", "<a>§ 1 BGB</a>"), "<a>§ 1 BGB</a>");
    }

    #[test]
    fn test_decode_sentinel_returns_input() {
        assert_eq!(decode_payload("§ 1 BGB", UNCHANGED_SENTINEL.to_string()), "§ 1 BGB");
        assert_eq!(decode_payload("§ 1 BGB", "linked".to_string()), "linked");
    }

    #[test]
    fn test_cutoff_moves_with_ttl() {
        let now = chrono::Utc::now().timestamp();
        assert!(cutoff(0) >= now);
        let week = cutoff(7);
        assert!(now - week >= 7 * SECONDS_PER_DAY);
        assert!(now - week <= 7 * SECONDS_PER_DAY + 5);
    }
}
