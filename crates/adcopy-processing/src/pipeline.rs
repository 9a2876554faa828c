//! Pipeline orchestrator
//!
//! `run` resolves the media, classifies it, checks the size ceiling, composes the prompt,
//! and dispatches on [`ClassifiedMedia`]. Provider handles are injected at construction;
//! nothing here is process-global. Every failure comes back as a typed [`AppError`].

use std::sync::Arc;

use adcopy_core::prompt::{compose_prompt, load_base_prompt};
use adcopy_core::validation::{check_size, normalize_mime, require_supported};
use adcopy_core::{
    AdCopyResult, AppError, Config, MediaKind, SizeLimits, StoredMedia, ValidationError,
};
use adcopy_providers::{
    ClaudeVisionClient, ClaudeVisionConfig, GeminiVideoClient, GeminiVideoConfig, PollPolicy,
    Sleeper, TokioSleeper, VideoJobManager, VideoProvider, VisionInvoker, VisionProvider,
};
use adcopy_storage::StorageGateway;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::media_ref::MediaRef;

/// Media whose kind has been established. Unsupported types never reach this point.
#[derive(Debug, Clone)]
pub enum ClassifiedMedia {
    Image { data: Bytes, mime_type: String },
    Video { data: Bytes, mime_type: String },
}

impl ClassifiedMedia {
    fn new(kind: MediaKind, data: Bytes, mime_type: String) -> Self {
        match kind {
            MediaKind::Image => ClassifiedMedia::Image { data, mime_type },
            MediaKind::Video => ClassifiedMedia::Video { data, mime_type },
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            ClassifiedMedia::Image { .. } => MediaKind::Image,
            ClassifiedMedia::Video { .. } => MediaKind::Video,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub kind: MediaKind,
    pub result: AdCopyResult,
}

impl PipelineOutput {
    pub fn render(&self) -> String {
        self.result.render(self.kind)
    }
}

#[derive(Clone)]
pub struct AdCopyPipeline {
    gateway: StorageGateway,
    vision: Option<VisionInvoker>,
    video: Option<VideoJobManager>,
    limits: SizeLimits,
    base_prompt: String,
}

impl AdCopyPipeline {
    pub fn new(gateway: StorageGateway, limits: SizeLimits, base_prompt: impl Into<String>) -> Self {
        Self {
            gateway,
            vision: None,
            video: None,
            limits,
            base_prompt: base_prompt.into(),
        }
    }

    pub fn with_vision_provider(mut self, provider: Arc<dyn VisionProvider>) -> Self {
        self.vision = Some(VisionInvoker::new(provider));
        self
    }

    pub fn with_video_provider(
        mut self,
        provider: Arc<dyn VideoProvider>,
        sleeper: Arc<dyn Sleeper>,
        policy: PollPolicy,
    ) -> Self {
        self.video = Some(VideoJobManager::new(provider, sleeper, policy));
        self
    }

    /// Build the production pipeline. Providers whose API key is missing are left out and
    /// requests for that media kind fail with a configuration error.
    pub fn from_config(config: &Config, gateway: StorageGateway) -> anyhow::Result<Self> {
        let base_prompt = load_base_prompt(config.prompt_file())?;
        let mut pipeline = Self::new(gateway, config.size_limits(), base_prompt);

        if config.anthropic_api_key().is_some() {
            let client = ClaudeVisionClient::new(ClaudeVisionConfig::from_config(config)?)?;
            pipeline = pipeline.with_vision_provider(Arc::new(client));
        } else {
            tracing::warn!("ANTHROPIC_API_KEY not set; image ad copy is disabled");
        }

        if config.gemini_api_key().is_some() {
            let client = GeminiVideoClient::new(GeminiVideoConfig::from_config(config)?)?;
            pipeline = pipeline.with_video_provider(
                Arc::new(client),
                Arc::new(TokioSleeper),
                PollPolicy::from_config(config),
            );
        } else {
            tracing::warn!("GEMINI_API_KEY not set; video ad copy is disabled");
        }

        Ok(pipeline)
    }

    pub fn gateway(&self) -> &StorageGateway {
        &self.gateway
    }

    pub fn size_limits(&self) -> SizeLimits {
        self.limits
    }

    pub fn has_vision(&self) -> bool {
        self.vision.is_some()
    }

    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    pub async fn run(
        &self,
        media: MediaRef,
        additional_context: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutput, AppError> {
        let start = std::time::Instant::now();

        let media = self.resolve(media, cancel).await?;
        let kind = media.kind();
        let prompt = compose_prompt(&self.base_prompt, additional_context);

        let result = match media {
            ClassifiedMedia::Image { data, mime_type } => {
                let vision = self.vision.as_ref().ok_or_else(|| {
                    AppError::Config("Image processing is not configured".to_string())
                })?;
                adcopy_providers::cancellable(cancel, vision.invoke(data, &mime_type, &prompt))
                    .await?
            }
            ClassifiedMedia::Video { data, mime_type } => {
                let video = self.video.as_ref().ok_or_else(|| {
                    AppError::Config("Video processing is not configured".to_string())
                })?;
                video.process(data, &mime_type, &prompt, cancel).await?
            }
        };

        tracing::info!(
            kind = %kind,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Ad copy generated"
        );

        Ok(PipelineOutput { kind, result })
    }

    /// Resolve bytes and MIME type, classify, and enforce the size ceiling. Stored media is
    /// checked from its metadata before the body is downloaded.
    pub async fn resolve(
        &self,
        media: MediaRef,
        cancel: &CancellationToken,
    ) -> Result<ClassifiedMedia, AppError> {
        match media {
            MediaRef::Inline { data, mime_type } => {
                let mime_type = normalize_mime(&mime_type);
                let kind = require_supported(&mime_type)?;
                check_size(kind, data.len() as u64, &self.limits)?;
                Ok(ClassifiedMedia::new(kind, data, mime_type))
            }
            MediaRef::Stored { key } => self.resolve_stored(&key, cancel).await,
            MediaRef::Url { url } => {
                let key = self.gateway.resolve_key_from_url(&url).ok_or_else(|| {
                    ValidationError::InvalidReference("Invalid media URL format".to_string())
                })?;
                self.resolve_stored(&key, cancel).await
            }
        }
    }

    async fn resolve_stored(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<ClassifiedMedia, AppError> {
        let StoredMedia {
            mime_type,
            size_bytes,
            ..
        } = adcopy_providers::cancellable(cancel, self.gateway.metadata(key)).await?;

        let mime_type = normalize_mime(&mime_type);
        let kind = require_supported(&mime_type)?;
        check_size(kind, size_bytes, &self.limits)?;

        tracing::debug!(
            key = %key,
            kind = %kind,
            mime_type = %mime_type,
            size_bytes = size_bytes,
            "Resolved stored media"
        );

        let data = adcopy_providers::cancellable(cancel, self.gateway.fetch(key)).await?;
        Ok(ClassifiedMedia::new(kind, data, mime_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adcopy_core::prompt::CONTEXT_SEPARATOR;
    use adcopy_core::ProviderOutput;
    use adcopy_providers::test_helpers::{
        RecordingSleeper, ScriptedVideoProvider, StaticVisionProvider,
    };
    use adcopy_storage::S3Storage;

    const BASE_URL: &str = "http://localhost:8787/files";

    struct Harness {
        pipeline: AdCopyPipeline,
        vision: Arc<StaticVisionProvider>,
        video: Arc<ScriptedVideoProvider>,
    }

    fn harness(limits: SizeLimits) -> Harness {
        let gateway = StorageGateway::new(Arc::new(S3Storage::in_memory()), BASE_URL, 3600);
        let vision = Arc::new(StaticVisionProvider::new(ProviderOutput::Structured(
            AdCopyResult::new("Image headline", "Image body"),
        )));
        let video = Arc::new(
            ScriptedVideoProvider::new(ScriptedVideoProvider::processing("files/v"))
                .then(ScriptedVideoProvider::active("files/v", "https://files/v", "video/mp4")),
        );
        let pipeline = AdCopyPipeline::new(gateway, limits, "BASE")
            .with_vision_provider(vision.clone())
            .with_video_provider(
                video.clone(),
                Arc::new(RecordingSleeper::default()),
                PollPolicy::default(),
            );
        Harness {
            pipeline,
            vision,
            video,
        }
    }

    #[tokio::test]
    async fn test_inline_image_routes_to_vision_with_context() {
        let h = harness(SizeLimits::default());
        let output = h
            .pipeline
            .run(
                MediaRef::inline(vec![1u8; 16], "image/png"),
                Some("Mention the spring sale"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(output.kind, MediaKind::Image);
        assert_eq!(output.result.headline, "Image headline");
        let calls = h.vision.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].prompt,
            format!("BASE{}Mention the spring sale", CONTEXT_SEPARATOR)
        );
        assert_eq!(h.video.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_stored_video_by_url_routes_to_video() {
        let h = harness(SizeLimits::default());
        let stored = h
            .pipeline
            .gateway()
            .store(Bytes::from_static(b"\x00\x00\x00\x18ftypmp42"), "video/mp4")
            .await
            .unwrap();
        let descriptor = h.pipeline.gateway().build_access_url(&stored.key).unwrap();

        let output = h
            .pipeline
            .run(MediaRef::url(descriptor.url), None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(output.kind, MediaKind::Video);
        assert_eq!(output.result.headline, "Scripted headline");
        assert!(output.render().starts_with("VIDEO AD COPY GENERATED"));
        assert_eq!(h.video.upload_count(), 1);
        assert_eq!(h.video.poll_count(), 1);
        assert_eq!(h.video.generate_calls()[0].2, "BASE");
        assert!(h.vision.calls().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_image_rejected_before_provider() {
        let h = harness(SizeLimits {
            max_image_bytes: 10 * 1024 * 1024,
            max_video_bytes: 50 * 1024 * 1024,
        });
        let err = h
            .pipeline
            .run(
                MediaRef::inline(vec![0u8; 11 * 1024 * 1024], "image/jpeg"),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Validation(ValidationError::FileTooLarge { .. })
        ));
        assert!(h.vision.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_mime_is_validation_error() {
        let h = harness(SizeLimits::default());
        let err = h
            .pipeline
            .run(
                MediaRef::inline(vec![1u8; 4], "application/pdf"),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::UnsupportedMediaType { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_stored_key_is_not_found() {
        let h = harness(SizeLimits::default());
        let err = h
            .pipeline
            .run(
                MediaRef::stored("media/0-missing.png"),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unparsable_url_is_validation_error() {
        let h = harness(SizeLimits::default());
        let err = h
            .pipeline
            .run(MediaRef::url("::not a url::"), None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid media URL format"));
    }

    #[tokio::test]
    async fn test_missing_provider_is_config_error() {
        let gateway = StorageGateway::new(Arc::new(S3Storage::in_memory()), BASE_URL, 3600);
        let pipeline = AdCopyPipeline::new(gateway, SizeLimits::default(), "BASE");
        assert!(!pipeline.has_vision() && !pipeline.has_video());

        let err = pipeline
            .run(
                MediaRef::inline(vec![1u8; 4], "video/webm"),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_cancelled_request_does_not_call_provider() {
        let h = harness(SizeLimits::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = h
            .pipeline
            .run(MediaRef::inline(vec![1u8; 4], "image/gif"), None, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
        assert!(h.vision.calls().is_empty());
    }

    #[tokio::test]
    async fn test_vision_failure_surfaces_once_without_retry() {
        let gateway = StorageGateway::new(Arc::new(S3Storage::in_memory()), BASE_URL, 3600);
        let vision = Arc::new(StaticVisionProvider::failing("overloaded"));
        let pipeline = AdCopyPipeline::new(gateway, SizeLimits::default(), "BASE")
            .with_vision_provider(vision.clone());

        let err = pipeline
            .run(
                MediaRef::inline(vec![1u8; 16], "image/webp"),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Provider(ref msg) if msg == "overloaded"));
        assert_eq!(vision.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_request_skips_storage_reads() {
        let h = harness(SizeLimits::default());
        let stored = h
            .pipeline
            .gateway()
            .store(Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = h
            .pipeline
            .resolve(MediaRef::stored(stored.key), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
    }
}
