//! Core types and shared functionality for vernetzen.
//!
//! This crate provides:
//! - Fingerprint cache with file and SQLite backends
//! - Unified error types
//! - Configuration structures
//! - Pipeline event observers

pub mod cache;
pub mod config;
pub mod error;
pub mod events;

pub use cache::{CacheKey, FileCache, FingerprintCache, KeyDigest, SqliteCache};
pub use config::{AppConfig, CacheBackend, ConfigError};
pub use error::Error;
pub use events::{EventLog, PipelineEvents, TracingEvents};
