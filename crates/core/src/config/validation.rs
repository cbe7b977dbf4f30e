//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `min_interval_ms` exceeds one minute
    /// - `endpoint` is not an absolute http(s) URL
    /// - `version` or `opt_out_marker` is empty
    /// - `cache_days` exceeds ten years
    ///
    /// Returns `ConfigError::Missing` if `link_hosts` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.min_interval_ms > 60_000 {
            return Err(ConfigError::Invalid {
                field: "min_interval_ms".into(),
                reason: "must not exceed one minute (60000ms)".into(),
            });
        }

        let scheme = self.endpoint.split_once("://").map(|(scheme, _)| scheme.to_ascii_lowercase());
        if !matches!(scheme.as_deref(), Some("http") | Some("https")) {
            return Err(ConfigError::Invalid {
                field: "endpoint".into(),
                reason: format!("expected an http(s) URL, got {:?}", self.endpoint),
            });
        }

        if self.version.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "version".into(), reason: "must not be empty".into() });
        }

        if self.opt_out_marker.is_empty() {
            return Err(ConfigError::Invalid { field: "opt_out_marker".into(), reason: "must not be empty".into() });
        }

        if self.cache_days > 3650 {
            return Err(ConfigError::Invalid { field: "cache_days".into(), reason: "must not exceed 3650".into() });
        }

        if self.link_hosts.is_empty() {
            return Err(ConfigError::Missing {
                field: "link_hosts".into(),
                hint: "Set VERNETZEN_LINK_HOSTS, e.g. \"dejure.org\"".into(),
            });
        }

        if self.provider_id.is_none() {
            tracing::warn!("provider_id is not set; the linking service will see a placeholder identity");
        }

        Ok(())
    }
}
