//! Provider boundaries
//!
//! The pipeline depends only on these traits; concrete HTTP clients are injected at
//! construction time so tests can substitute scripted providers.

use adcopy_core::{AppError, ProviderOutput};
use async_trait::async_trait;
use bytes::Bytes;

/// Synchronous image-capable model.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Send one image plus prompt and return whatever text (or structured result) came back.
    async fn describe_image(
        &self,
        image: Bytes,
        mime_type: &str,
        prompt: &str,
    ) -> Result<ProviderOutput, AppError>;

    fn name(&self) -> &str;
}

/// A file as reported by the video provider's staging API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub name: String,
    pub state: String,
    pub uri: Option<String>,
    pub mime_type: Option<String>,
}

/// Video-capable model with out-of-band file staging.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    async fn upload(&self, data: Bytes, mime_type: &str) -> Result<RemoteFile, AppError>;

    async fn get_file(&self, name: &str) -> Result<RemoteFile, AppError>;

    /// Generate text for a staged file. An empty string means the model returned no text.
    async fn generate_content(
        &self,
        file_uri: &str,
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, AppError>;

    fn name(&self) -> &str;
}
