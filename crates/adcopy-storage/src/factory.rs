#[cfg(feature = "storage-local")]
use crate::LocalStorage;
use crate::{AccessUrlSigner, S3Storage, Storage, StorageBackend, StorageError, StorageGateway, StorageResult};
use adcopy_core::Config;
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend() {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket()
                .map(String::from)
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let region = config.s3_region().map(String::from).ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;
            let endpoint = config.s3_endpoint().map(String::from);

            let storage = S3Storage::new(bucket, region, endpoint)?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path().map(String::from).ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;

            let storage = LocalStorage::new(base_path).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; uploads are lost on restart");
            Ok(Arc::new(S3Storage::in_memory()))
        }
    }
}

/// Create the gateway over the configured backend, signing URLs when a secret is set.
pub async fn create_gateway(config: &Config) -> StorageResult<StorageGateway> {
    let storage = create_storage(config).await?;
    let gateway = StorageGateway::new(
        storage,
        config.public_base_url(),
        config.signed_url_expiration_seconds(),
    );

    Ok(match config.access_url_signing_secret() {
        Some(secret) => gateway.with_signer(AccessUrlSigner::new(secret)),
        None => gateway,
    })
}
