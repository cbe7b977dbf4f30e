//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (VERNETZEN_*)
//! 2. TOML config file (if VERNETZEN_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::KeyDigest;

mod validation;

pub use validation::ConfigError;

/// Identity sent to the linking service when no provider id is configured.
pub const UNKNOWN_PROVIDER_ID: &str = "http://unknown.vernetzen.installation.invalid";

/// Which store backs the fingerprint cache.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// One file per entry inside `cache_dir`.
    #[default]
    Files,
    /// A single SQLite database at `db_path`.
    Sqlite,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (VERNETZEN_*)
/// 2. TOML config file (if VERNETZEN_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding cache entries and the purge marker.
    ///
    /// Set via VERNETZEN_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Cache store implementation.
    ///
    /// Set via VERNETZEN_CACHE_BACKEND environment variable (`files` or `sqlite`).
    #[serde(default)]
    pub cache_backend: CacheBackend,

    /// Path to the SQLite database when `cache_backend = "sqlite"`.
    ///
    /// Set via VERNETZEN_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Digest used for cache file names.
    ///
    /// Set via VERNETZEN_KEY_DIGEST environment variable (`md5` or `sha256`).
    #[serde(default)]
    pub key_digest: KeyDigest,

    /// Default cache validity in days when the caller passes no `cache_days`.
    ///
    /// Set via VERNETZEN_CACHE_DAYS environment variable.
    #[serde(default = "default_cache_days")]
    pub cache_days: u32,

    /// Linking service endpoint.
    ///
    /// Set via VERNETZEN_ENDPOINT environment variable.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via VERNETZEN_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Minimum pause between two requests to the linking service.
    ///
    /// Set via VERNETZEN_MIN_INTERVAL_MS environment variable.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Caller identity (usually the site's base URL).
    ///
    /// Set via VERNETZEN_PROVIDER_ID environment variable.
    #[serde(default)]
    pub provider_id: Option<String>,

    /// Protocol version tag sent with every request.
    ///
    /// Set via VERNETZEN_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Marker comment that disables linking for a document.
    ///
    /// Set via VERNETZEN_OPT_OUT_MARKER environment variable.
    #[serde(default = "default_opt_out_marker")]
    pub opt_out_marker: String,

    /// Hosts whose anchors the integrity check strips before comparing.
    ///
    /// Set via VERNETZEN_LINK_HOSTS environment variable (`[dejure.org, buzer.de]`).
    #[serde(default = "default_link_hosts")]
    pub link_hosts: Vec<String>,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("tmp/dejure-org")
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tmp/dejure-org.sqlite")
}

fn default_cache_days() -> u32 {
    7
}

fn default_endpoint() -> String {
    "https://rechtsnetz.dejure.org/dienste/vernetzung/vernetzen".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_min_interval_ms() -> u64 {
    1_000
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").into()
}

fn default_opt_out_marker() -> String {
    "<!--keine-vernetzung-->".into()
}

fn default_link_hosts() -> Vec<String> {
    vec!["dejure.org".into()]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            cache_backend: CacheBackend::default(),
            db_path: default_db_path(),
            key_digest: KeyDigest::default(),
            cache_days: default_cache_days(),
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
            min_interval_ms: default_min_interval_ms(),
            provider_id: None,
            version: default_version(),
            opt_out_marker: default_opt_out_marker(),
            link_hosts: default_link_hosts(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Minimum request interval as Duration.
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Caller identity, falling back to a placeholder when unset.
    pub fn provider_id(&self) -> &str {
        self.provider_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(UNKNOWN_PROVIDER_ID)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `VERNETZEN_`
    /// 2. TOML file from `VERNETZEN_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("VERNETZEN_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("VERNETZEN_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let mut config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        config.normalize_link_hosts();

        config.validate()?;

        Ok(config)
    }

    /// Lowercase hosts and split entries that were written as one comma-joined string.
    fn normalize_link_hosts(&mut self) {
        self.link_hosts = self
            .link_hosts
            .iter()
            .flat_map(|h| h.split(','))
            .map(|h| h.trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
    }
}
