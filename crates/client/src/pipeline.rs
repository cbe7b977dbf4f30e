//! Annotation pipeline: trigger check, cache lookup, remote call, integrity check.
//!
//! Every failure inside the pipeline degrades to returning text without new
//! links. Only construction can fail.

use std::sync::Arc;

use vernetzen_core::{
    AppConfig, CacheBackend, FileCache, FingerprintCache, PipelineEvents, SqliteCache, TracingEvents, cache::CacheDb,
};

use crate::dejure::{AnnotateRequest, DejureClient, DejureConfig, DejureError, FilterParams};
use crate::integrity::IntegrityVerifier;
use crate::trigger::{has_citation_trigger, has_opt_out};

/// Caller parameter holding the TTL override.
pub const CACHE_DAYS_PARAM: &str = "cache_days";

/// Errors that can occur while building a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Cache(#[from] vernetzen_core::Error),

    #[error(transparent)]
    Client(#[from] DejureError),
}

/// Per-pipeline settings copied out of [`AppConfig`].
#[derive(Debug, Clone)]
struct Settings {
    cache_days: u32,
    opt_out_marker: String,
    version: String,
    provider_id: String,
}

/// Links legal citations in a text through the dejure.org service.
pub struct AnnotationPipeline {
    client: DejureClient,
    cache: Arc<dyn FingerprintCache>,
    verifier: IntegrityVerifier,
    events: Arc<dyn PipelineEvents>,
    settings: Settings,
}

impl AnnotationPipeline {
    /// Build a pipeline with the cache backend selected in `config`.
    pub async fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let cache: Arc<dyn FingerprintCache> = match config.cache_backend {
            CacheBackend::Files => Arc::new(FileCache::new(&config.cache_dir, config.key_digest)),
            CacheBackend::Sqlite => Arc::new(SqliteCache::new(CacheDb::open(&config.db_path).await?, config.key_digest)),
        };
        Ok(Self::new(config, cache)?)
    }

    /// Build a pipeline around an existing cache.
    pub fn new(config: &AppConfig, cache: Arc<dyn FingerprintCache>) -> Result<Self, DejureError> {
        Ok(Self {
            client: DejureClient::new(DejureConfig::from(config))?,
            cache,
            verifier: IntegrityVerifier::new(&config.link_hosts),
            events: Arc::new(TracingEvents),
            settings: Settings {
                cache_days: config.cache_days,
                opt_out_marker: config.opt_out_marker.clone(),
                version: config.version.clone(),
                provider_id: config.provider_id().to_string(),
            },
        })
    }

    /// Report events to `events` instead of the tracing log.
    pub fn with_events(mut self, events: Arc<dyn PipelineEvents>) -> Self {
        self.events = events;
        self
    }

    pub fn cache(&self) -> &dyn FingerprintCache {
        self.cache.as_ref()
    }

    /// Default TTL in days when the caller passes no `cache_days`.
    pub fn default_cache_days(&self) -> u32 {
        self.settings.cache_days
    }

    /// Return `text` with citation links added where the service and the
    /// integrity check agree; otherwise the text without new links.
    ///
    /// `params` is never modified.
    pub async fn run(&self, text: &str, params: &FilterParams) -> String {
        if !has_citation_trigger(text) {
            tracing::trace!("no citation-like content, skipping");
            return text.to_string();
        }
        if has_opt_out(text, &self.settings.opt_out_marker) {
            tracing::debug!("opt-out marker present, skipping");
            return text.to_string();
        }

        let mut params = params.clone();
        let cache_days = self.take_cache_days(&mut params);

        let input = text.trim();
        let key = self.cache.key_for(input);

        let cached = match self.cache.read(input, cache_days).await {
            Ok(hit) => hit,
            Err(e) => {
                self.events.on_cache_error(&e);
                None
            }
        };

        let candidate = match cached {
            Some(hit) => {
                self.events.on_cache_hit(&key);
                hit
            }
            None => self.annotate(input, &params, cache_days).await,
        };

        match self.verifier.check(text, &candidate) {
            Ok(()) => candidate,
            Err(e) => {
                tracing::debug!(error = %e, "integrity mismatch");
                self.events.on_integrity_failure(&key);
                text.to_string()
            }
        }
    }

    /// Cache-miss path: purge if due, then ask the service.
    async fn annotate(&self, input: &str, params: &FilterParams, cache_days: u32) -> String {
        match self.cache.purge_if_due(cache_days).await {
            Ok(Some(deleted)) => self.events.on_cache_purged(deleted),
            Ok(None) => {}
            Err(e) => self.events.on_cache_error(&e),
        }

        match AnnotateRequest::from_params(params, &self.settings.version, &self.settings.provider_id) {
            Ok(req) => {
                self.client
                    .call(input, &req, self.cache.as_ref(), self.events.as_ref())
                    .await
            }
            Err(e) => {
                self.events.on_remote_error(&e);
                input.to_string()
            }
        }
    }

    /// Remove `cache_days` from `params`, falling back to the configured default.
    fn take_cache_days(&self, params: &mut FilterParams) -> u32 {
        match params.remove(CACHE_DAYS_PARAM) {
            None => self.settings.cache_days,
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("invalid cache_days {:?}, using {}", value, self.settings.cache_days);
                self.settings.cache_days
            }),
        }
    }
}
