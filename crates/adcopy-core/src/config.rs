//! Configuration module
//!
//! Settings are read from the environment (after loading `.env`), defaulted where a
//! sensible default exists, and validated once at startup.

use std::env;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::storage_types::StorageBackend;
use crate::validation::SizeLimits;

const SERVER_PORT: u16 = 8787;
const MAX_IMAGE_SIZE_MB: u64 = 10;
const MAX_VIDEO_SIZE_MB: u64 = 50;
const SIGNED_URL_EXPIRATION_SECONDS: u64 = 86_400;
const MIN_SIGNING_SECRET_LEN: usize = 32;
const VIDEO_POLL_INTERVAL_MS: u64 = 2_000;
const VIDEO_MAX_POLL_ATTEMPTS: u32 = 60;
const PROVIDER_TIMEOUT_SECS: u64 = 120;
const PUBLIC_BASE_URL: &str = "http://localhost:8787/files";
const ANTHROPIC_MODEL: &str = "claude-sonnet-4-5";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const GEMINI_MODEL: &str = "gemini-2.0-flash-exp";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const R2_DEFAULT_REGION: &str = "auto";

/// Settings shared by every binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
}

/// Full service configuration
#[derive(Clone)]
pub struct AdCopyConfig {
    pub base: BaseConfig,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // R2 / MinIO endpoint
    pub local_storage_path: Option<String>,
    // Access URLs
    pub public_base_url: String,
    pub signed_url_expiration_seconds: u64,
    pub access_url_signing_secret: Option<String>,
    // Size policy
    pub max_image_size_bytes: u64,
    pub max_video_size_bytes: u64,
    // Providers
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub anthropic_base_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub provider_timeout_secs: u64,
    pub video_poll_interval_ms: u64,
    pub video_max_poll_attempts: u32,
    pub prompt_file: Option<String>,
}

impl Debug for AdCopyConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AdCopyConfig")
            .field("base", &self.base)
            .field("storage_backend", &self.storage_backend)
            .field("s3_bucket", &self.s3_bucket)
            .field("s3_region", &self.s3_region)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("local_storage_path", &self.local_storage_path)
            .field("public_base_url", &self.public_base_url)
            .field(
                "signed_url_expiration_seconds",
                &self.signed_url_expiration_seconds,
            )
            .field("has_signing_secret", &self.access_url_signing_secret.is_some())
            .field("max_image_size_bytes", &self.max_image_size_bytes)
            .field("max_video_size_bytes", &self.max_video_size_bytes)
            .field("has_anthropic_api_key", &self.anthropic_api_key.is_some())
            .field("anthropic_model", &self.anthropic_model)
            .field("has_gemini_api_key", &self.gemini_api_key.is_some())
            .field("gemini_model", &self.gemini_model)
            .field("video_poll_interval_ms", &self.video_poll_interval_ms)
            .field("video_max_poll_attempts", &self.video_max_poll_attempts)
            .field("prompt_file", &self.prompt_file)
            .finish()
    }
}

impl Default for AdCopyConfig {
    /// In-memory storage with every other setting at its default. Used by tests and
    /// local experiments.
    fn default() -> Self {
        Self {
            base: BaseConfig {
                server_port: SERVER_PORT,
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
            },
            storage_backend: StorageBackend::Memory,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: None,
            public_base_url: PUBLIC_BASE_URL.to_string(),
            signed_url_expiration_seconds: SIGNED_URL_EXPIRATION_SECONDS,
            access_url_signing_secret: None,
            max_image_size_bytes: MAX_IMAGE_SIZE_MB * 1024 * 1024,
            max_video_size_bytes: MAX_VIDEO_SIZE_MB * 1024 * 1024,
            anthropic_api_key: None,
            anthropic_model: ANTHROPIC_MODEL.to_string(),
            anthropic_base_url: ANTHROPIC_BASE_URL.to_string(),
            gemini_api_key: None,
            gemini_model: GEMINI_MODEL.to_string(),
            gemini_base_url: GEMINI_BASE_URL.to_string(),
            provider_timeout_secs: PROVIDER_TIMEOUT_SECS,
            video_poll_interval_ms: VIDEO_POLL_INTERVAL_MS,
            video_max_poll_attempts: VIDEO_MAX_POLL_ATTEMPTS,
            prompt_file: None,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug, Default)]
pub struct Config(pub Box<AdCopyConfig>);

impl Config {
    fn inner(&self) -> &AdCopyConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_environment(&self.inner().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = AdCopyConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    /// Configured region, falling back to `auto` when a custom endpoint (R2) is set.
    pub fn s3_region(&self) -> Option<&str> {
        let inner = self.inner();
        inner
            .s3_region
            .as_deref()
            .or_else(|| inner.s3_endpoint.as_ref().map(|_| R2_DEFAULT_REGION))
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn public_base_url(&self) -> &str {
        &self.inner().public_base_url
    }

    pub fn signed_url_expiration_seconds(&self) -> u64 {
        self.inner().signed_url_expiration_seconds
    }

    pub fn access_url_signing_secret(&self) -> Option<&str> {
        self.inner().access_url_signing_secret.as_deref()
    }

    pub fn size_limits(&self) -> SizeLimits {
        SizeLimits {
            max_image_bytes: self.inner().max_image_size_bytes,
            max_video_bytes: self.inner().max_video_size_bytes,
        }
    }

    pub fn anthropic_api_key(&self) -> Option<&str> {
        self.inner().anthropic_api_key.as_deref()
    }

    pub fn anthropic_model(&self) -> &str {
        &self.inner().anthropic_model
    }

    pub fn anthropic_base_url(&self) -> &str {
        &self.inner().anthropic_base_url
    }

    pub fn gemini_api_key(&self) -> Option<&str> {
        self.inner().gemini_api_key.as_deref()
    }

    pub fn gemini_model(&self) -> &str {
        &self.inner().gemini_model
    }

    pub fn gemini_base_url(&self) -> &str {
        &self.inner().gemini_base_url
    }

    pub fn provider_timeout_secs(&self) -> u64 {
        self.inner().provider_timeout_secs
    }

    pub fn video_poll_interval_ms(&self) -> u64 {
        self.inner().video_poll_interval_ms
    }

    pub fn video_max_poll_attempts(&self) -> u32 {
        self.inner().video_max_poll_attempts
    }

    pub fn prompt_file(&self) -> Option<&str> {
        self.inner().prompt_file.as_deref()
    }
}

fn is_production_environment(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AdCopyConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
        };

        let storage_backend = match non_empty_var("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::S3,
        };

        let max_image_size_mb = env::var("MAX_IMAGE_SIZE_MB")
            .unwrap_or_else(|_| MAX_IMAGE_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(MAX_IMAGE_SIZE_MB);

        let max_video_size_mb = env::var("MAX_VIDEO_SIZE_MB")
            .unwrap_or_else(|_| MAX_VIDEO_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(MAX_VIDEO_SIZE_MB);

        // Zero would hand out already-expired links.
        let signed_url_expiration_seconds = env::var("SIGNED_URL_EXPIRATION_SECONDS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|&secs| secs > 0)
            .unwrap_or(SIGNED_URL_EXPIRATION_SECONDS);

        let config = AdCopyConfig {
            base,
            storage_backend,
            s3_bucket: non_empty_var("S3_BUCKET"),
            s3_region: non_empty_var("S3_REGION").or_else(|| non_empty_var("AWS_REGION")),
            s3_endpoint: non_empty_var("S3_ENDPOINT"),
            local_storage_path: non_empty_var("LOCAL_STORAGE_PATH"),
            public_base_url: non_empty_var("MEDIA_PUBLIC_BASE_URL")
                .unwrap_or_else(|| PUBLIC_BASE_URL.to_string()),
            signed_url_expiration_seconds,
            access_url_signing_secret: non_empty_var("ACCESS_URL_SIGNING_SECRET"),
            max_image_size_bytes: max_image_size_mb * 1024 * 1024,
            max_video_size_bytes: max_video_size_mb * 1024 * 1024,
            anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
            anthropic_model: non_empty_var("ANTHROPIC_MODEL")
                .unwrap_or_else(|| ANTHROPIC_MODEL.to_string()),
            anthropic_base_url: non_empty_var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|| ANTHROPIC_BASE_URL.to_string()),
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),
            gemini_model: non_empty_var("GEMINI_MODEL").unwrap_or_else(|| GEMINI_MODEL.to_string()),
            gemini_base_url: non_empty_var("GEMINI_BASE_URL")
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            provider_timeout_secs: env::var("PROVIDER_TIMEOUT_SECS")
                .unwrap_or_else(|_| PROVIDER_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(PROVIDER_TIMEOUT_SECS),
            video_poll_interval_ms: env::var("VIDEO_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| VIDEO_POLL_INTERVAL_MS.to_string())
                .parse()
                .unwrap_or(VIDEO_POLL_INTERVAL_MS),
            video_max_poll_attempts: env::var("VIDEO_MAX_POLL_ATTEMPTS")
                .unwrap_or_else(|_| VIDEO_MAX_POLL_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(VIDEO_MAX_POLL_ATTEMPTS),
            prompt_file: non_empty_var("AD_COPY_PROMPT_FILE"),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if is_production_environment(&self.base.environment)
            && self.base.cors_origins.iter().any(|o| o == "*")
        {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.s3_endpoint.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when no S3_ENDPOINT is configured"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
            StorageBackend::Memory => {}
        }

        if !(self.public_base_url.starts_with("http://")
            || self.public_base_url.starts_with("https://"))
        {
            return Err(anyhow::anyhow!(
                "MEDIA_PUBLIC_BASE_URL must be an http(s) URL"
            ));
        }

        if let Some(secret) = &self.access_url_signing_secret {
            if secret.len() < MIN_SIGNING_SECRET_LEN {
                return Err(anyhow::anyhow!(
                    "ACCESS_URL_SIGNING_SECRET must be at least {} characters long",
                    MIN_SIGNING_SECRET_LEN
                ));
            }
        }

        if self.max_image_size_bytes == 0 || self.max_video_size_bytes == 0 {
            return Err(anyhow::anyhow!(
                "MAX_IMAGE_SIZE_MB and MAX_VIDEO_SIZE_MB must be greater than zero"
            ));
        }

        if self.video_max_poll_attempts == 0 {
            return Err(anyhow::anyhow!(
                "VIDEO_MAX_POLL_ATTEMPTS must be greater than zero"
            ));
        }

        Ok(())
    }
}
