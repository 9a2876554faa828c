//! Data models for the pipeline
//!
//! Each sub-module holds one area of the domain: stored media and access descriptors,
//! the generated ad copy, and the transient video processing job.

mod ad_copy;
mod media;
mod video_job;

pub use ad_copy::AdCopyResult;
pub use media::{ClassifiedKind, MediaClassification, MediaKind, SignedAccessDescriptor, StoredMedia};
pub use video_job::{VideoJobState, VideoProcessingJob};
