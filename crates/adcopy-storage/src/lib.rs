//! Ad Copy Storage Library
//!
//! Object storage abstraction, backends, and the storage gateway used by the upload
//! endpoint and the pipeline.
//!
//! # Storage key format
//!
//! `media/{millisecond-timestamp}-{uuid-v4}.{extension}`, with the extension taken from
//! the MIME type. Keys must not contain `.`/`..` segments or a leading `/`. Key generation
//! is centralized in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod gateway;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod s3;
pub mod signing;
pub mod traits;

// Re-export commonly used types
pub use adcopy_core::StorageBackend;
pub use factory::{create_gateway, create_storage};
pub use gateway::{build_access_url, resolve_key_from_url, StorageGateway};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use s3::S3Storage;
pub use signing::AccessUrlSigner;
pub use traits::{
    ObjectAttributes, ObjectMetadata, Storage, StorageError, StorageResult, StoredObject,
};
