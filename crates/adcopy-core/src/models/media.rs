use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A media kind the pipeline can route to a provider.
///
/// There is no "unknown" variant: unsupported MIME types are rejected during
/// classification and never reach dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Plural noun used in user-facing size messages ("for images").
    pub fn plural(&self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Classification outcome including the unsupported case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifiedKind {
    Image,
    Video,
    Unknown,
}

impl From<MediaKind> for ClassifiedKind {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => ClassifiedKind::Image,
            MediaKind::Video => ClassifiedKind::Video,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaClassification {
    pub valid: bool,
    pub kind: ClassifiedKind,
}

impl MediaClassification {
    pub fn supported(kind: MediaKind) -> Self {
        Self {
            valid: true,
            kind: kind.into(),
        }
    }

    pub fn unknown() -> Self {
        Self {
            valid: false,
            kind: ClassifiedKind::Unknown,
        }
    }

    /// The routable kind, or `None` when the MIME type is unsupported.
    pub fn media_kind(&self) -> Option<MediaKind> {
        match self.kind {
            ClassifiedKind::Image => Some(MediaKind::Image),
            ClassifiedKind::Video => Some(MediaKind::Video),
            ClassifiedKind::Unknown => None,
        }
    }
}

/// An object persisted through the storage gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMedia {
    pub key: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// URL plus claimed expiry handed out after an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedAccessDescriptor {
    pub url: String,
    pub key: String,
    pub expires_at: DateTime<Utc>,
}
