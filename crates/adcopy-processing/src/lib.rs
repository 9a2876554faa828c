//! Ad Copy Processing
//!
//! The pipeline orchestrator: resolves a media reference to bytes and a MIME type,
//! classifies it, enforces the size ceiling, and routes it to the vision or video path.

pub mod media_ref;
pub mod pipeline;

pub use media_ref::MediaRef;
pub use pipeline::{AdCopyPipeline, ClassifiedMedia, PipelineOutput};
