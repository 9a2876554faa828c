//! Storage key generation and validation.
//!
//! Key format: `media/{millisecond-timestamp}-{uuid-v4}.{extension}`. Uniqueness comes from
//! the UUID; the timestamp only keeps listings roughly chronological.

use adcopy_core::validation::extension_for_mime;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

pub const KEY_PREFIX: &str = "media";

/// Generate a storage key for an object of `mime_type` uploaded at `now`.
pub fn generate_storage_key(mime_type: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}/{}-{}.{}",
        KEY_PREFIX,
        now.timestamp_millis(),
        Uuid::new_v4(),
        extension_for_mime(mime_type)
    )
}

/// Reject keys that could escape a backend's namespace or would not survive URL round-trips.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.starts_with('/') {
        return Err(StorageError::InvalidKey(
            "Storage key must not start with '/'".to_string(),
        ));
    }
    if key.split('/').any(|segment| segment == ".." || segment == ".") {
        return Err(StorageError::InvalidKey(
            "Storage key contains relative path segments".to_string(),
        ));
    }
    if key.contains('\0') {
        return Err(StorageError::InvalidKey(
            "Storage key contains a NUL byte".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_key_shape(key: &str, extension: &str) {
        let rest = key.strip_prefix("media/").expect("media/ prefix");
        let (millis, tail) = rest.split_once('-').expect("timestamp separator");
        assert!(!millis.is_empty() && millis.chars().all(|c| c.is_ascii_digit()));
        let (uuid, ext) = tail.rsplit_once('.').expect("extension");
        assert!(Uuid::parse_str(uuid).is_ok(), "{}", uuid);
        assert_eq!(ext, extension);
    }

    #[test]
    fn test_generate_key_shape() {
        let key = generate_storage_key("image/jpeg", Utc::now());
        assert_key_shape(&key, "jpg");
        assert_key_shape(&generate_storage_key("video/quicktime", Utc::now()), "mov");
        assert_key_shape(&generate_storage_key("application/x-thing", Utc::now()), "bin");
    }

    #[test]
    fn test_keys_unique_within_same_millisecond() {
        let now = Utc::now();
        let a = generate_storage_key("image/png", now);
        let b = generate_storage_key("image/png", now);
        assert_ne!(a, b);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("media/1-abc.jpg").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("media/../secret").is_err());
        assert!(validate_key("media/./x").is_err());
        assert!(validate_key("media/..hidden").is_ok());
    }
}
