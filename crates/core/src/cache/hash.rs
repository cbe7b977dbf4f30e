//! Content-addressed cache key generation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Digest algorithm used for the hex part of a cache key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeyDigest {
    /// MD5, matching the file names written by the nanoc dejure filter.
    #[default]
    Md5,
    Sha256,
}

/// Cache key for one input text: character count followed by the hex digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Compute the key for `text` with the given digest.
    pub fn compute(text: &str, digest: KeyDigest) -> Self {
        let hex = match digest {
            KeyDigest::Md5 => format!("{:x}", md5::compute(text.as_bytes())),
            KeyDigest::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(text.as_bytes());
                hex::encode(hasher.finalize())
            }
        };
        Self(format!("{}{}", text.chars().count(), hex))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
