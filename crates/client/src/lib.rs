//! Client code for vernetzen.
//!
//! This crate provides the dejure.org linking client, the integrity check
//! for its responses, and the annotation pipeline that ties them to the
//! fingerprint cache.

pub mod dejure;
pub mod integrity;
pub mod pipeline;
pub mod trigger;

pub use dejure::{AnnotateRequest, DejureClient, DejureConfig, DejureError, FilterParams, Format};
pub use integrity::{IntegrityError, IntegrityVerifier};
pub use pipeline::{AnnotationPipeline, PipelineError};
pub use trigger::{has_citation_trigger, has_opt_out};
