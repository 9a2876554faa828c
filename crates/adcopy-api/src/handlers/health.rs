//! Configuration health. Reports which integrations are configured, never their values.

use std::sync::Arc;

use adcopy_core::{Config, StorageBackend};
use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ConfigHealthResponse {
    pub has_anthropic: bool,
    pub has_gemini: bool,
    pub has_storage: bool,
    pub public_base_url: String,
}

impl ConfigHealthResponse {
    pub fn from_config(config: &Config) -> Self {
        let has_storage = match config.storage_backend() {
            StorageBackend::S3 => config.s3_bucket().is_some(),
            StorageBackend::Local => config.local_storage_path().is_some(),
            StorageBackend::Memory => true,
        };

        Self {
            has_anthropic: config.anthropic_api_key().is_some(),
            has_gemini: config.gemini_api_key().is_some(),
            has_storage,
            public_base_url: config.public_base_url().to_string(),
        }
    }
}

pub async fn config_health(State(state): State<Arc<AppState>>) -> Json<ConfigHealthResponse> {
    Json(ConfigHealthResponse::from_config(&state.config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use adcopy_core::AdCopyConfig;

    #[test]
    fn test_reports_presence_without_values() {
        let config = Config(Box::new(AdCopyConfig {
            anthropic_api_key: Some("sk-ant-secret".to_string()),
            ..AdCopyConfig::default()
        }));
        let health = ConfigHealthResponse::from_config(&config);
        assert!(health.has_anthropic);
        assert!(!health.has_gemini);
        assert!(health.has_storage);

        let body = serde_json::to_string(&health).unwrap();
        assert!(!body.contains("sk-ant-secret"));
    }

    #[test]
    fn test_s3_without_bucket_has_no_storage() {
        let config = Config(Box::new(AdCopyConfig {
            storage_backend: StorageBackend::S3,
            ..AdCopyConfig::default()
        }));
        assert!(!ConfigHealthResponse::from_config(&config).has_storage);
    }
}
