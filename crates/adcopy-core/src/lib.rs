//! Ad Copy Core Library
//!
//! Domain models, error types, configuration, media classification, and response
//! normalization shared by every component of the media-to-ad-copy pipeline.

pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod prompt;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{AdCopyConfig, BaseConfig, Config};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    AdCopyResult, ClassifiedKind, MediaClassification, MediaKind, SignedAccessDescriptor,
    StoredMedia, VideoJobState, VideoProcessingJob,
};
pub use normalize::{normalize, normalize_output, ProviderOutput};
pub use storage_types::StorageBackend;
pub use validation::{SizeLimits, ValidationError};
