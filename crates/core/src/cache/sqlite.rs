//! SQLite-backed fingerprint cache.
//!
//! Mirrors [`FileCache`](super::FileCache): `written_at` replaces the file
//! mtime and the purge marker lives in `cache_meta`.

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

use super::connection::CacheDb;
use super::{CacheKey, Error, FingerprintCache, KeyDigest, PURGE_MARKER, cutoff, decode_payload, encode_payload};

/// Fingerprint cache stored in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteCache {
    db: CacheDb,
    digest: KeyDigest,
}

impl SqliteCache {
    pub fn new(db: CacheDb, digest: KeyDigest) -> Self {
        Self { db, digest }
    }

    /// Timestamp recorded by the last purge, if any.
    pub async fn last_purge(&self) -> Result<Option<i64>, Error> {
        self.db
            .conn
            .call(|conn| -> Result<Option<i64>, Error> {
                let value: Option<String> = conn
                    .query_row("SELECT value FROM cache_meta WHERE name = ?1", params![PURGE_MARKER], |row| {
                        row.get(0)
                    })
                    .optional()?;
                Ok(value.and_then(|v| v.trim().parse().ok()))
            })
            .await
            .map_err(Error::from)
    }

    async fn write_at(&self, key: CacheKey, payload: String, written_at: i64) -> Result<(), Error> {
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (cache_key, payload, written_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(cache_key) DO UPDATE SET
                        payload = excluded.payload,
                        written_at = excluded.written_at",
                    params![key.as_str(), payload, written_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl FingerprintCache for SqliteCache {
    fn key_for(&self, text: &str) -> CacheKey {
        CacheKey::compute(text, self.digest)
    }

    async fn read(&self, text: &str, ttl_days: u32) -> Result<Option<String>, Error> {
        let key = self.key_for(text);
        let cutoff = cutoff(ttl_days);
        let payload = self
            .db
            .conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let payload = conn
                    .query_row(
                        "SELECT payload FROM cache_entries WHERE cache_key = ?1 AND written_at > ?2",
                        params![key.as_str(), cutoff],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(payload)
            })
            .await
            .map_err(Error::from)?;

        Ok(payload.map(|p| decode_payload(text, p)))
    }

    async fn write(&self, text: &str, output: &str) -> Result<(), Error> {
        let payload = encode_payload(text, output).to_string();
        self.write_at(self.key_for(text), payload, chrono::Utc::now().timestamp())
            .await
    }

    async fn purge_if_due(&self, ttl_days: u32) -> Result<Option<u64>, Error> {
        let cutoff = cutoff(ttl_days);
        if let Some(last) = self.last_purge().await?
            && last > cutoff
        {
            return Ok(None);
        }

        let now = chrono::Utc::now().timestamp();
        let deleted = self
            .db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let deleted = tx.execute("DELETE FROM cache_entries WHERE written_at < ?1", params![cutoff])?;
                tx.execute(
                    "INSERT INTO cache_meta (name, value) VALUES (?1, ?2)
                     ON CONFLICT(name) DO UPDATE SET value = excluded.value",
                    params![PURGE_MARKER, now.to_string()],
                )?;
                tx.commit()?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)?;

        Ok(Some(deleted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn make_cache() -> SqliteCache {
        SqliteCache::new(CacheDb::open_in_memory().await.unwrap(), KeyDigest::Md5)
    }

    fn days_ago(days: i64) -> i64 {
        chrono::Utc::now().timestamp() - days * 86_400
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let cache = make_cache().await;
        cache.write("§ 1 BGB", "linked § 1 BGB").await.unwrap();
        assert_eq!(cache.read("§ 1 BGB", 7).await.unwrap().as_deref(), Some("linked § 1 BGB"));
    }

    #[tokio::test]
    async fn test_read_missing() {
        let cache = make_cache().await;
        assert!(cache.read("§ 1 BGB", 7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sentinel_round_trip() {
        let cache = make_cache().await;
        cache.write("§ 1 BGB", "§ 1 BGB").await.unwrap();
        assert_eq!(cache.read("§ 1 BGB", 7).await.unwrap().as_deref(), Some("§ 1 BGB"));
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss() {
        let cache = make_cache().await;
        let key = cache.key_for("§ 1 BGB");
        cache.write_at(key, "linked".into(), days_ago(3)).await.unwrap();

        assert!(cache.read("§ 1 BGB", 7).await.unwrap().is_some());
        assert!(cache.read("§ 1 BGB", 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_recurrence() {
        let cache = make_cache().await;
        cache.write_at(cache.key_for("old"), "old".into(), days_ago(10)).await.unwrap();
        cache.write("fresh", "fresh linked").await.unwrap();

        assert_eq!(cache.purge_if_due(7).await.unwrap(), Some(1));
        assert!(cache.read("fresh", 7).await.unwrap().is_some());

        cache.write_at(cache.key_for("old"), "old".into(), days_ago(10)).await.unwrap();
        assert_eq!(cache.purge_if_due(7).await.unwrap(), None);
        assert!(cache.last_purge().await.unwrap().is_some());
    }
}
