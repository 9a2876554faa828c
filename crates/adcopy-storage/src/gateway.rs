//! Storage gateway
//!
//! Addressing and retrieval of uploaded media on top of any [`Storage`] backend: key
//! generation, metadata recovery, and the mapping between keys and fetchable URLs.
//!
//! Access URLs embed the key segment-wise percent-encoded under the public base URL. The
//! `expiresAt` on a descriptor is only enforced when a signer is configured, and then by the
//! route that serves the object, not by the gateway.

use std::sync::Arc;

use adcopy_core::{AppError, SignedAccessDescriptor, StoredMedia, ValidationError};
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::keys::{generate_storage_key, validate_key};
use crate::signing::{AccessUrlSigner, EXPIRES_PARAM, SIGNATURE_PARAM};
use crate::traits::{ObjectAttributes, Storage};

/// Custom metadata entry holding the upload time (RFC 3339).
pub const UPLOADED_AT_METADATA: &str = "uploadedAt";

/// Characters left as-is inside a key segment; everything else is escaped.
const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Clone)]
pub struct StorageGateway {
    storage: Arc<dyn Storage>,
    public_base_url: String,
    expiration_seconds: u64,
    signer: Option<AccessUrlSigner>,
}

impl StorageGateway {
    pub fn new(
        storage: Arc<dyn Storage>,
        public_base_url: impl Into<String>,
        expiration_seconds: u64,
    ) -> Self {
        Self {
            storage,
            public_base_url: public_base_url.into(),
            expiration_seconds,
            signer: None,
        }
    }

    /// Sign access URLs and enable [`StorageGateway::verify_access`].
    pub fn with_signer(mut self, signer: AccessUrlSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    pub fn requires_signature(&self) -> bool {
        self.signer.is_some()
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Write `data` under a freshly generated key.
    pub async fn store(&self, data: Bytes, mime_type: &str) -> Result<StoredMedia, AppError> {
        let uploaded_at = Utc::now();
        let key = generate_storage_key(mime_type, uploaded_at);
        let size_bytes = data.len() as u64;

        let attributes = ObjectAttributes::new(mime_type)
            .with_metadata(UPLOADED_AT_METADATA, uploaded_at.to_rfc3339());

        self.storage
            .put(&key, data, attributes)
            .await
            .map_err(|e| AppError::StorageWrite(e.to_string()))?;

        tracing::info!(
            key = %key,
            mime_type = %mime_type,
            size_bytes = size_bytes,
            backend = %self.storage.backend_type(),
            "Media stored"
        );

        Ok(StoredMedia {
            key,
            mime_type: mime_type.to_string(),
            size_bytes,
            uploaded_at,
        })
    }

    pub async fn fetch(&self, key: &str) -> Result<Bytes, AppError> {
        self.fetch_with_metadata(key).await.map(|(data, _)| data)
    }

    /// Bytes plus metadata in one backend round-trip.
    pub async fn fetch_with_metadata(&self, key: &str) -> Result<(Bytes, StoredMedia), AppError> {
        let object = self
            .storage
            .get(key)
            .await?
            .ok_or_else(|| not_found(key))?;

        let media = stored_media(key, object.metadata)?;
        Ok((object.data, media))
    }

    /// Recover content type, size and upload time without reading the body.
    pub async fn metadata(&self, key: &str) -> Result<StoredMedia, AppError> {
        let metadata = self
            .storage
            .head(key)
            .await?
            .ok_or_else(|| not_found(key))?;

        stored_media(key, metadata)
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.storage.delete(key).await?;
        Ok(())
    }

    /// Access descriptor using the configured base URL and expiration window.
    pub fn build_access_url(&self, key: &str) -> Result<SignedAccessDescriptor, AppError> {
        let mut descriptor =
            build_access_url(key, self.expiration_seconds, &self.public_base_url, Utc::now());

        if let Some(signer) = &self.signer {
            let signature = signer.sign(key, descriptor.expires_at)?;
            descriptor.url = format!(
                "{}?{}={}&{}={}",
                descriptor.url,
                EXPIRES_PARAM,
                descriptor.expires_at.timestamp(),
                SIGNATURE_PARAM,
                signature
            );
        }

        Ok(descriptor)
    }

    pub fn resolve_key_from_url(&self, url: &str) -> Option<String> {
        resolve_key_from_url(url, &self.public_base_url)
    }

    /// Enforce the signature on an access URL. Always succeeds when no signer is configured.
    pub fn verify_access(
        &self,
        key: &str,
        expires: Option<&str>,
        signature: Option<&str>,
    ) -> Result<(), AppError> {
        let Some(signer) = &self.signer else {
            return Ok(());
        };

        let (Some(expires), Some(signature)) = (expires, signature) else {
            return Err(AppError::AccessDenied(
                "Missing access signature".to_string(),
            ));
        };
        let expires = expires
            .parse::<i64>()
            .map_err(|_| AppError::AccessDenied("Invalid expiry".to_string()))?;

        signer.verify(key, expires, signature, Utc::now())
    }
}

fn not_found(key: &str) -> AppError {
    AppError::NotFound(format!("Media not found: {}", key))
}

fn stored_media(
    key: &str,
    metadata: crate::traits::ObjectMetadata,
) -> Result<StoredMedia, AppError> {
    let mime_type = metadata
        .content_type
        .filter(|ct| !ct.trim().is_empty())
        .ok_or_else(|| {
            AppError::Validation(ValidationError::InvalidReference(format!(
                "Stored object {} has no content type",
                key
            )))
        })?;

    let uploaded_at = metadata
        .custom_metadata
        .get(UPLOADED_AT_METADATA)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or(metadata.last_modified);

    Ok(StoredMedia {
        key: key.to_string(),
        mime_type,
        size_bytes: metadata.size_bytes,
        uploaded_at,
    })
}

/// Percent-encode each `/`-separated segment of `key`.
pub fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(|segment| utf8_percent_encode(segment, KEY_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join `base_url` and the encoded key; `expires_at = now + expiry_seconds`.
pub fn build_access_url(
    key: &str,
    expiry_seconds: u64,
    base_url: &str,
    now: DateTime<Utc>,
) -> SignedAccessDescriptor {
    let expires_at = i64::try_from(expiry_seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|window| now.checked_add_signed(window))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    SignedAccessDescriptor {
        url: format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            encode_key_path(key)
        ),
        key: key.to_string(),
        expires_at,
    }
}

/// Recover the key from an access URL. Returns `None` for anything that does not parse or
/// does not decode to a valid key; query and fragment are ignored.
///
/// When the URL path begins with the path of `base_url`, that prefix is removed first.
pub fn resolve_key_from_url(url: &str, base_url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;

    let base_path = Url::parse(base_url)
        .map(|base| base.path().trim_matches('/').to_string())
        .unwrap_or_default();
    let base_segments: Vec<&str> = base_path.split('/').filter(|s| !s.is_empty()).collect();

    let path = parsed.path().trim_start_matches('/');
    let raw_segments: Vec<&str> = path.split('/').collect();

    let skip = if !base_segments.is_empty()
        && raw_segments.len() > base_segments.len()
        && raw_segments
            .iter()
            .zip(base_segments.iter())
            .all(|(a, b)| a == b)
    {
        base_segments.len()
    } else {
        0
    };

    let mut decoded = Vec::with_capacity(raw_segments.len() - skip);
    for segment in &raw_segments[skip..] {
        decoded.push(percent_decode_str(segment).decode_utf8().ok()?.into_owned());
    }
    let key = decoded.join("/");

    validate_key(&key).ok()?;
    Some(key)
}
