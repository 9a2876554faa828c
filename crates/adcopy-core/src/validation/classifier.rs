//! Media classification and size policy.
//!
//! Classification is a pure lookup against two fixed allow-lists. A MIME type appears in
//! at most one of them.

use crate::models::{MediaClassification, MediaKind};

pub const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

pub const VIDEO_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/quicktime",
    "video/x-msvideo",
    "video/x-matroska",
    "video/webm",
];

pub const FALLBACK_EXTENSION: &str = "bin";

pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_MAX_VIDEO_BYTES: u64 = 50 * 1024 * 1024;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unsupported file type: {mime_type}. Supported types: {}", supported_mime_types().join(", "))]
    UnsupportedMediaType { mime_type: String },

    #[error(
        "File size ({}MB) exceeds maximum allowed size of {}MB for {}.",
        fractional_mb(.size),
        whole_mb(.max),
        kind_plural(.kind)
    )]
    FileTooLarge { kind: MediaKind, size: u64, max: u64 },

    #[error("Empty file")]
    EmptyFile,

    #[error("Invalid media reference: {0}")]
    InvalidReference(String),
}

fn fractional_mb(bytes: &u64) -> String {
    format!("{:.2}", *bytes as f64 / BYTES_PER_MB)
}

fn whole_mb(bytes: &u64) -> u64 {
    *bytes / (1024 * 1024)
}

fn kind_plural(kind: &MediaKind) -> &'static str {
    kind.plural()
}

/// Per-kind size ceilings in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    pub max_image_bytes: u64,
    pub max_video_bytes: u64,
}

impl SizeLimits {
    pub fn for_kind(&self, kind: MediaKind) -> u64 {
        match kind {
            MediaKind::Image => self.max_image_bytes,
            MediaKind::Video => self.max_video_bytes,
        }
    }
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_video_bytes: DEFAULT_MAX_VIDEO_BYTES,
        }
    }
}

/// Lowercase, trim, and drop any parameters (`video/mp4; codecs=avc1` -> `video/mp4`).
pub fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn classify(mime_type: &str) -> MediaClassification {
    let mime = normalize_mime(mime_type);
    if IMAGE_MIME_TYPES.contains(&mime.as_str()) {
        MediaClassification::supported(MediaKind::Image)
    } else if VIDEO_MIME_TYPES.contains(&mime.as_str()) {
        MediaClassification::supported(MediaKind::Video)
    } else {
        MediaClassification::unknown()
    }
}

/// Classify and turn the unsupported case into a [`ValidationError`].
pub fn require_supported(mime_type: &str) -> Result<MediaKind, ValidationError> {
    classify(mime_type)
        .media_kind()
        .ok_or_else(|| ValidationError::UnsupportedMediaType {
            mime_type: mime_type.to_string(),
        })
}

pub fn check_size(kind: MediaKind, size_bytes: u64, limits: &SizeLimits) -> Result<(), ValidationError> {
    if size_bytes == 0 {
        return Err(ValidationError::EmptyFile);
    }

    let max = limits.for_kind(kind);
    if size_bytes > max {
        return Err(ValidationError::FileTooLarge {
            kind,
            size: size_bytes,
            max,
        });
    }

    Ok(())
}

/// File extension used in storage keys. Unknown MIME types map to [`FALLBACK_EXTENSION`].
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match normalize_mime(mime_type).as_str() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/x-msvideo" => "avi",
        "video/x-matroska" => "mkv",
        "video/webm" => "webm",
        _ => FALLBACK_EXTENSION,
    }
}

pub fn supported_mime_types() -> Vec<&'static str> {
    IMAGE_MIME_TYPES
        .iter()
        .chain(VIDEO_MIME_TYPES.iter())
        .copied()
        .collect()
}
