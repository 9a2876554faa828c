use crate::keys::validate_key;
use crate::traits::{ObjectAttributes, ObjectMetadata, Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const METADATA_DIR: &str = ".metadata";

/// Sidecar record persisted next to each object, since plain files carry no content type.
#[derive(Debug, Serialize, Deserialize)]
struct SidecarMetadata {
    content_type: String,
    size_bytes: u64,
    written_at: DateTime<Utc>,
    #[serde(default)]
    custom_metadata: BTreeMap<String, String>,
}

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for object storage (e.g., "/var/lib/adcopy/media")
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    /// Convert storage key to filesystem path with security validation
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        if key == METADATA_DIR || key.starts_with(&format!("{}/", METADATA_DIR)) {
            return Err(StorageError::InvalidKey(
                "Storage key uses a reserved prefix".to_string(),
            ));
        }

        let path = self.base_path.join(key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        // Only an existing path can be canonicalized; symlinks must not lead outside.
        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    fn sidecar_path(&self, key: &str) -> PathBuf {
        self.base_path
            .join(METADATA_DIR)
            .join(format!("{}.json", key))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn read_sidecar(&self, key: &str) -> StorageResult<Option<SidecarMetadata>> {
        match fs::read(self.sidecar_path(key)).await {
            Ok(raw) => serde_json::from_slice(&raw).map(Some).map_err(|e| {
                StorageError::BackendError(format!("Corrupt metadata for {}: {}", key, e))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::IoError(e)),
        }
    }

    async fn load_metadata(&self, key: &str, path: &Path) -> StorageResult<Option<ObjectMetadata>> {
        let file_meta = match fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::IoError(e)),
        };

        let sidecar = self.read_sidecar(key).await?;
        let last_modified = sidecar
            .as_ref()
            .map(|s| s.written_at)
            .or_else(|| file_meta.modified().ok().map(DateTime::<Utc>::from))
            .unwrap_or_else(Utc::now);

        Ok(Some(match sidecar {
            Some(sidecar) => ObjectMetadata {
                content_type: Some(sidecar.content_type),
                size_bytes: file_meta.len(),
                last_modified,
                custom_metadata: sidecar.custom_metadata,
            },
            None => ObjectMetadata {
                content_type: None,
                size_bytes: file_meta.len(),
                last_modified,
                custom_metadata: BTreeMap::new(),
            },
        }))
    }

    async fn write_file(path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut file = fs::File::create(path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        attributes: ObjectAttributes,
    ) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let sidecar_path = self.sidecar_path(key);
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;
        self.ensure_parent_dir(&sidecar_path).await?;

        Self::write_file(&path, &data).await?;

        let sidecar = SidecarMetadata {
            content_type: attributes.content_type,
            size_bytes: size,
            written_at: Utc::now(),
            custom_metadata: attributes.custom_metadata,
        };
        let encoded = serde_json::to_vec(&sidecar)
            .map_err(|e| StorageError::UploadFailed(format!("Failed to encode metadata: {}", e)))?;
        Self::write_file(&sidecar_path, &encoded).await?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<StoredObject>> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::DownloadFailed(format!(
                    "Failed to read file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let Some(metadata) = self.load_metadata(key, &path).await? else {
            return Ok(None);
        };

        tracing::debug!(
            key = %key,
            size_bytes = data.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage read successful"
        );

        Ok(Some(StoredObject {
            data: Bytes::from(data),
            metadata,
        }))
    }

    async fn head(&self, key: &str) -> StorageResult<Option<ObjectMetadata>> {
        let path = self.key_to_path(key)?;
        self.load_metadata(key, &path).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        for target in [path.clone(), self.sidecar_path(key)] {
            match fs::remove_file(&target).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StorageError::DeleteFailed(format!(
                        "Failed to delete file {}: {}",
                        target.display(),
                        e
                    )))
                }
            }
        }

        tracing::info!(path = %path.display(), key = %key, "Local storage delete successful");

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn storage() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_put_then_get_preserves_content_type() {
        let (_dir, storage) = storage().await;
        storage
            .put(
                "media/1-x.mp4",
                Bytes::from_static(b"\x00\x00\x00\x18ftyp"),
                ObjectAttributes::new("video/mp4").with_metadata("uploadedAt", "t"),
            )
            .await
            .unwrap();

        let object = storage.get("media/1-x.mp4").await.unwrap().unwrap();
        assert_eq!(object.data.len(), 8);
        assert_eq!(object.metadata.content_type.as_deref(), Some("video/mp4"));
        assert_eq!(object.metadata.size_bytes, 8);
        assert_eq!(
            object.metadata.custom_metadata.get("uploadedAt").map(String::as_str),
            Some("t")
        );
    }

    #[tokio::test]
    async fn test_missing_object() {
        let (_dir, storage) = storage().await;
        assert!(storage.get("media/none.png").await.unwrap().is_none());
        assert!(storage.head("media/none.png").await.unwrap().is_none());
        storage.delete("media/none.png").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_traversal_and_reserved_prefix() {
        let (_dir, storage) = storage().await;
        let traversal = storage.get("media/../../secret").await;
        assert!(matches!(traversal, Err(StorageError::InvalidKey(_))));

        let reserved = storage
            .put(
                ".metadata/media/x.json",
                Bytes::from_static(b"{}"),
                ObjectAttributes::new("application/json"),
            )
            .await;
        assert!(matches!(reserved, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_sidecar() {
        let (dir, storage) = storage().await;
        storage
            .put(
                "media/2-y.png",
                Bytes::from_static(b"png"),
                ObjectAttributes::new("image/png"),
            )
            .await
            .unwrap();
        assert!(dir.path().join(".metadata/media/2-y.png.json").exists());

        storage.delete("media/2-y.png").await.unwrap();
        assert!(!dir.path().join("media/2-y.png").exists());
        assert!(!dir.path().join(".metadata/media/2-y.png.json").exists());
    }
}
