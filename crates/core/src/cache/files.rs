//! Directory-backed cache store.
//!
//! Layout of the cache root:
//!
//! - `<chars><hexdigest>`: one file per entry, age taken from its mtime
//! - `lastpurge`: decimal Unix timestamp of the last purge sweep
//!
//! Writes go to a hidden temporary file in the same directory and are renamed
//! into place, so readers see either the old or the new entry.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use super::{CacheKey, Error, FingerprintCache, KeyDigest, PURGE_MARKER, cutoff, decode_payload, encode_payload};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fingerprint cache stored as plain files under a root directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
    digest: KeyDigest,
}

impl FileCache {
    pub fn new(root: impl Into<PathBuf>, digest: KeyDigest) -> Self {
        Self { root: root.into(), digest }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    fn marker_path(&self) -> PathBuf {
        self.root.join(PURGE_MARKER)
    }

    /// Timestamp recorded by the last purge, if any.
    ///
    /// An unreadable timestamp counts as "never purged".
    pub async fn last_purge(&self) -> Result<Option<i64>, Error> {
        let marker = self.marker_path();
        match tokio::fs::read_to_string(&marker).await {
            Ok(content) => Ok(content.trim().parse::<i64>().ok()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(&marker, e)),
        }
    }
}

fn mtime_secs(metadata: &std::fs::Metadata, path: &Path) -> Result<i64, Error> {
    let modified = metadata.modified().map_err(|e| Error::io(path, e))?;
    Ok(chrono::DateTime::<chrono::Utc>::from(modified).timestamp())
}

#[async_trait]
impl FingerprintCache for FileCache {
    fn key_for(&self, text: &str) -> CacheKey {
        CacheKey::compute(text, self.digest)
    }

    async fn read(&self, text: &str, ttl_days: u32) -> Result<Option<String>, Error> {
        let path = self.entry_path(&self.key_for(text));

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(&path, e)),
        };

        if !metadata.is_file() || mtime_secs(&metadata, &path)? <= cutoff(ttl_days) {
            return Ok(None);
        }

        match tokio::fs::read_to_string(&path).await {
            Ok(payload) => Ok(Some(decode_payload(text, payload))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(&path, e)),
        }
    }

    async fn write(&self, text: &str, output: &str) -> Result<(), Error> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Error::io(&self.root, e))?;

        let key = self.key_for(text);
        let path = self.entry_path(&key);
        let tmp = self.root.join(format!(
            ".{}.{}-{}.tmp",
            key,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        tokio::fs::write(&tmp, encode_payload(text, output))
            .await
            .map_err(|e| Error::io(&tmp, e))?;

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::io(&path, e));
        }

        tracing::debug!("cached {} ({} bytes)", key, output.len());
        Ok(())
    }

    async fn purge_if_due(&self, ttl_days: u32) -> Result<Option<u64>, Error> {
        match tokio::fs::metadata(&self.root).await {
            Ok(metadata) if metadata.is_dir() => {}
            _ => return Ok(None),
        }

        let cutoff = cutoff(ttl_days);
        if let Some(last) = self.last_purge().await?
            && last > cutoff
        {
            return Ok(None);
        }

        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| Error::io(&self.root, e))?;

        let mut deleted = 0u64;
        while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(&self.root, e))? {
            if entry.file_name() == PURGE_MARKER {
                continue;
            }

            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::io(&path, e)),
            };

            if !metadata.is_file() || mtime_secs(&metadata, &path)? >= cutoff {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => deleted += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(Error::io(&path, e)),
            }
        }

        let marker = self.marker_path();
        tokio::fs::write(&marker, chrono::Utc::now().timestamp().to_string())
            .await
            .map_err(|e| Error::io(&marker, e))?;

        tracing::debug!("purged {} entries from {}", deleted, self.root.display());
        Ok(Some(deleted))
    }
}
