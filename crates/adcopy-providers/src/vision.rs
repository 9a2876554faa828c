use std::sync::Arc;

use adcopy_core::validation::{classify, normalize_mime};
use adcopy_core::{normalize_output, AdCopyResult, AppError, MediaKind, ValidationError};
use bytes::Bytes;

use crate::traits::VisionProvider;

/// Synchronous image path: one provider call, then normalization.
#[derive(Clone)]
pub struct VisionInvoker {
    provider: Arc<dyn VisionProvider>,
}

impl VisionInvoker {
    pub fn new(provider: Arc<dyn VisionProvider>) -> Self {
        Self { provider }
    }

    pub async fn invoke(
        &self,
        image: Bytes,
        mime_type: &str,
        prompt: &str,
    ) -> Result<AdCopyResult, AppError> {
        let mime_type = normalize_mime(mime_type);
        if classify(&mime_type).media_kind() != Some(MediaKind::Image) {
            return Err(ValidationError::UnsupportedMediaType { mime_type }.into());
        }

        tracing::info!(
            provider = %self.provider.name(),
            mime_type = %mime_type,
            size_bytes = image.len() as u64,
            "Generating ad copy from image"
        );

        let output = self
            .provider
            .describe_image(image, &mime_type, prompt)
            .await?;

        normalize_output(output)
    }
}
