//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.
//! Absence of an object is reported as `Ok(None)`, never as an error.

use crate::StorageBackend;
use adcopy_core::{AppError, ValidationError};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Attributes written alongside an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectAttributes {
    pub content_type: String,
    pub custom_metadata: BTreeMap<String, String>,
}

impl ObjectAttributes {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            custom_metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_metadata.insert(name.into(), value.into());
        self
    }
}

/// What a `head` returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_type: Option<String>,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
    pub custom_metadata: BTreeMap<String, String>,
}

/// What a `get` returns.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub metadata: ObjectMetadata,
}

/// Storage abstraction trait
///
/// All storage backends (S3/R2, local filesystem, in-memory) implement this trait so the
/// gateway can work with any of them without coupling to backend details.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` at `key`, replacing any existing object.
    async fn put(&self, key: &str, data: Bytes, attributes: ObjectAttributes)
        -> StorageResult<()>;

    /// Read an object and its metadata.
    async fn get(&self, key: &str) -> StorageResult<Option<StoredObject>>;

    /// Read only the metadata of an object.
    async fn head(&self, key: &str) -> StorageResult<Option<ObjectMetadata>>;

    /// Delete an object. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Media not found: {}", key)),
            StorageError::UploadFailed(msg) => AppError::StorageWrite(msg),
            StorageError::InvalidKey(msg) => {
                AppError::Validation(ValidationError::InvalidReference(msg))
            }
            StorageError::ConfigError(msg) => AppError::Config(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}
