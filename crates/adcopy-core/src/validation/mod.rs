//! Validation modules

pub mod classifier;

pub use classifier::{
    check_size, classify, extension_for_mime, normalize_mime, require_supported,
    supported_mime_types, SizeLimits, ValidationError, DEFAULT_MAX_IMAGE_BYTES,
    DEFAULT_MAX_VIDEO_BYTES, FALLBACK_EXTENSION, IMAGE_MIME_TYPES, VIDEO_MIME_TYPES,
};
