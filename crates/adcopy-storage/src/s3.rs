use crate::keys::validate_key;
use crate::traits::{ObjectAttributes, ObjectMetadata, Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, ObjectMeta, ObjectStore, ObjectStoreExt,
    PutOptions, PutPayload,
};
use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(feature = "storage-s3")]
use object_store::aws::AmazonS3Builder;

/// Object storage implementation backed by `object_store`.
///
/// Talks to S3-compatible services (AWS S3, Cloudflare R2, MinIO). [`S3Storage::in_memory`]
/// wraps an in-process store with identical semantics for tests and local runs.
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    backend: StorageBackend,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - bucket name
    /// * `region` - AWS region, or `auto` for R2
    /// * `endpoint_url` - custom endpoint for S3-compatible providers
    ///   (e.g. "https://<account>.r2.cloudflarestorage.com" or "http://localhost:9000")
    #[cfg(feature = "storage-s3")]
    pub fn new(bucket: String, region: String, endpoint_url: Option<String>) -> StorageResult<Self> {
        // Credentials come from AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store: Arc::new(store),
            bucket,
            backend: StorageBackend::S3,
        })
    }

    pub fn in_memory() -> Self {
        S3Storage {
            store: Arc::new(InMemory::new()),
            bucket: "memory".to_string(),
            backend: StorageBackend::Memory,
        }
    }

    fn location(key: &str) -> StorageResult<Path> {
        validate_key(key)?;
        Path::parse(key).map_err(|e| StorageError::InvalidKey(e.to_string()))
    }

    fn metadata_from(meta: &ObjectMeta, attributes: &Attributes) -> ObjectMetadata {
        let mut content_type = None;
        let mut custom_metadata = BTreeMap::new();

        for (attribute, value) in attributes.iter() {
            let value: &str = value.as_ref();
            match attribute {
                Attribute::ContentType => content_type = Some(value.to_string()),
                Attribute::Metadata(name) => {
                    custom_metadata.insert(name.to_string(), value.to_string());
                }
                _ => {}
            }
        }

        ObjectMetadata {
            content_type,
            size_bytes: meta.size as u64,
            last_modified: meta.last_modified,
            custom_metadata,
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        attributes: ObjectAttributes,
    ) -> StorageResult<()> {
        let location = Self::location(key)?;
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        let mut attrs = Attributes::new();
        attrs.insert(
            Attribute::ContentType,
            AttributeValue::from(attributes.content_type),
        );
        for (name, value) in attributes.custom_metadata {
            attrs.insert(Attribute::Metadata(name.into()), AttributeValue::from(value));
        }
        let opts = PutOptions {
            attributes: attrs,
            ..Default::default()
        };

        self.store
            .put_opts(&location, PutPayload::from(data), opts)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object store upload failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object store upload successful"
        );

        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<StoredObject>> {
        let location = Self::location(key)?;
        let start = std::time::Instant::now();

        let result = match self.store.get_opts(&location, GetOptions::default()).await {
            Ok(result) => result,
            Err(ObjectStoreError::NotFound { .. }) => return Ok(None),
            Err(other) => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object store download failed"
                );
                return Err(StorageError::DownloadFailed(other.to_string()));
            }
        };

        let metadata = Self::metadata_from(&result.meta, &result.attributes);
        let data = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = data.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object store download successful"
        );

        Ok(Some(StoredObject { data, metadata }))
    }

    async fn head(&self, key: &str) -> StorageResult<Option<ObjectMetadata>> {
        let location = Self::location(key)?;
        let options = GetOptions {
            head: true,
            ..Default::default()
        };

        match self.store.get_opts(&location, options).await {
            Ok(result) => Ok(Some(Self::metadata_from(&result.meta, &result.attributes))),
            Err(ObjectStoreError::NotFound { .. }) => Ok(None),
            Err(other) => Err(StorageError::BackendError(other.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let location = Self::location(key)?;
        let start = std::time::Instant::now();

        match self.store.delete(&location).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object store delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object store delete successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_head_roundtrip() {
        let storage = S3Storage::in_memory();
        let attributes =
            ObjectAttributes::new("image/png").with_metadata("uploadedAt", "2026-01-01T00:00:00Z");

        storage
            .put("media/1-a.png", Bytes::from_static(b"png-bytes"), attributes)
            .await
            .unwrap();

        let object = storage.get("media/1-a.png").await.unwrap().unwrap();
        assert_eq!(&object.data[..], b"png-bytes");
        assert_eq!(object.metadata.content_type.as_deref(), Some("image/png"));

        let head = storage.head("media/1-a.png").await.unwrap().unwrap();
        assert_eq!(head.size_bytes, 9);
        assert_eq!(
            head.custom_metadata.get("uploadedAt").map(String::as_str),
            Some("2026-01-01T00:00:00Z")
        );
    }

    #[tokio::test]
    async fn test_missing_object_is_none() {
        let storage = S3Storage::in_memory();
        assert!(storage.get("media/missing.jpg").await.unwrap().is_none());
        assert!(storage.head("media/missing.jpg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let storage = S3Storage::in_memory();
        storage
            .put(
                "media/2-b.gif",
                Bytes::from_static(b"gif"),
                ObjectAttributes::new("image/gif"),
            )
            .await
            .unwrap();
        storage.delete("media/2-b.gif").await.unwrap();
        storage.delete("media/2-b.gif").await.unwrap();
        assert!(storage.get("media/2-b.gif").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_key_rejected() {
        let storage = S3Storage::in_memory();
        let result = storage.get("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        assert_eq!(storage.backend_type(), StorageBackend::Memory);
    }
}
