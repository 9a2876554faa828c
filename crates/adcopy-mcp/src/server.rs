//! MCP server using rmcp SDK
//!
//! Exposes the ad copy pipeline as the `create_ad_copy` tool over stdio. Every failure is
//! returned as an error payload on a successful tool call, never as a protocol fault.

use std::future::Future;
use std::sync::Arc;

use adcopy_core::{AppError, ValidationError};
use adcopy_processing::{AdCopyPipeline, MediaRef, PipelineOutput};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::model::*;
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use tokio_util::sync::CancellationToken;

use crate::tools::CreateAdCopyRequest;

fn text_content(s: impl Into<String>) -> Content {
    Content {
        raw: RawContent::Text(RawTextContent { text: s.into() }),
        annotations: None,
    }
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
}

#[derive(Clone)]
pub struct AdCopyService {
    pipeline: Arc<AdCopyPipeline>,
    public_host: Option<String>,
    tool_router: ToolRouter<AdCopyService>,
}

#[tool_router]
impl AdCopyService {
    pub fn new(pipeline: AdCopyPipeline) -> Self {
        let public_host = host_of(pipeline.gateway().public_base_url());
        Self {
            pipeline: Arc::new(pipeline),
            public_host,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Generate a headline and primary text for a social ad from an uploaded image or video URL"
    )]
    async fn create_ad_copy(
        &self,
        Parameters(req): Parameters<CreateAdCopyRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(self.run_tool(req, &context.ct).await)
    }
}

impl AdCopyService {
    /// Run the tool and shape its outcome into a tool result.
    pub async fn run_tool(
        &self,
        req: CreateAdCopyRequest,
        cancel: &CancellationToken,
    ) -> CallToolResult {
        match self.generate(req, cancel).await {
            Ok(output) => CallToolResult::success(vec![text_content(output.render())]),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    error_type = err.error_type(),
                    "create_ad_copy failed"
                );
                CallToolResult::error(vec![text_content(format!(
                    "Error: {}",
                    tool_error_message(&err)
                ))])
            }
        }
    }

    pub async fn generate(
        &self,
        req: CreateAdCopyRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutput, AppError> {
        let media_host = host_of(&req.media_url);
        if let (Some(expected), Some(actual)) = (&self.public_host, &media_host) {
            if expected != actual {
                tracing::warn!(
                    expected_host = %expected,
                    media_host = %actual,
                    "Media URL host does not match the configured public host"
                );
            }
        }

        let key = self
            .pipeline
            .gateway()
            .resolve_key_from_url(&req.media_url)
            .ok_or_else(|| {
                ValidationError::InvalidReference("Invalid media URL format".to_string())
            })?;

        tracing::info!(key = %key, has_context = req.text.is_some(), "Creating ad copy");

        self.pipeline
            .run(MediaRef::stored(key), req.text.as_deref(), cancel)
            .await
    }
}

/// Message shown to the calling assistant. Reference errors are reported bare so the
/// assistant sees exactly what was wrong with the URL.
fn tool_error_message(err: &AppError) -> String {
    match err {
        AppError::Validation(ValidationError::InvalidReference(msg)) => msg.clone(),
        other => other.to_string(),
    }
}

#[tool_handler]
impl ServerHandler for AdCopyService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "adcopy-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
            instructions: Some(
                "Ad copy generation: call create_ad_copy with the URL returned by the upload \
                 endpoint and optional extra instructions."
                    .to_string(),
            ),
        }
    }
}
