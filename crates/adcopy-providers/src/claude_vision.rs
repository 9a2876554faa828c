//! Anthropic Messages API client for image ad copy.
//!
//! Requests use the structured-outputs beta so the reply is constrained to the
//! `{headline, primaryText}` schema; a reply that still fails to decode strictly is handed
//! back as free text for the normalizer.

use adcopy_core::{AdCopyResult, AppError, Config, ProviderOutput};
use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::traits::VisionProvider;

const API_VERSION: &str = "2023-06-01";
const STRUCTURED_OUTPUTS_BETA: &str = "structured-outputs-2025-11-13";
const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Clone)]
pub struct ClaudeVisionConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Ask for schema-constrained output.
    pub structured_output: bool,
}

impl Debug for ClaudeVisionConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ClaudeVisionConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("structured_output", &self.structured_output)
            .finish_non_exhaustive()
    }
}

impl ClaudeVisionConfig {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let api_key = config
            .anthropic_api_key()
            .ok_or_else(|| AppError::Config("ANTHROPIC_API_KEY not configured".to_string()))?;

        Ok(Self {
            api_key: api_key.to_string(),
            model: config.anthropic_model().to_string(),
            base_url: config.anthropic_base_url().to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(config.provider_timeout_secs()),
            structured_output: true,
        })
    }
}

pub struct ClaudeVisionClient {
    http_client: reqwest::Client,
    config: ClaudeVisionConfig,
}

impl Debug for ClaudeVisionClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ClaudeVisionClient")
            .field("config", &self.config)
            .finish()
    }
}

// Messages API request/response structures
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<MessageParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_format: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct MessageParam {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlockResponse>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlockResponse {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Strict shape of a schema-constrained reply.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StructuredAdCopy {
    headline: String,
    #[serde(rename = "primaryText")]
    primary_text: String,
}

fn ad_copy_schema() -> serde_json::Value {
    json!({
        "type": "json_schema",
        "schema": {
            "type": "object",
            "properties": {
                "headline": {
                    "type": "string",
                    "description": "The compelling ad headline that captures attention"
                },
                "primaryText": {
                    "type": "string",
                    "description": "The primary ad text that provides context and call-to-action"
                }
            },
            "required": ["headline", "primaryText"],
            "additionalProperties": false
        }
    })
}

impl ClaudeVisionClient {
    pub fn new(config: ClaudeVisionConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client for Claude Vision")?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn build_request(&self, image: &[u8], mime_type: &str, prompt: &str) -> MessagesRequest {
        let data = base64::engine::general_purpose::STANDARD.encode(image);

        MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            messages: vec![MessageParam {
                role: "user".to_string(),
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            source_type: "base64".to_string(),
                            media_type: mime_type.to_string(),
                            data,
                        },
                    },
                    ContentBlock::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
            output_format: self.config.structured_output.then(ad_copy_schema),
        }
    }
}

/// First text block of the reply, or a provider error.
fn first_text(response: MessagesResponse) -> Result<String, AppError> {
    response
        .content
        .into_iter()
        .find_map(|block| match block {
            ContentBlockResponse::Text { text } => Some(text),
            ContentBlockResponse::Other => None,
        })
        .ok_or_else(|| AppError::Provider("No text content in Claude response".to_string()))
}

fn classify_reply(text: String, structured: bool) -> ProviderOutput {
    if structured {
        if let Ok(parsed) = serde_json::from_str::<StructuredAdCopy>(text.trim()) {
            return ProviderOutput::Structured(AdCopyResult {
                headline: parsed.headline,
                primary_text: parsed.primary_text,
            });
        }
    }
    ProviderOutput::Text(text)
}

#[async_trait]
impl VisionProvider for ClaudeVisionClient {
    async fn describe_image(
        &self,
        image: Bytes,
        mime_type: &str,
        prompt: &str,
    ) -> Result<ProviderOutput, AppError> {
        let start = std::time::Instant::now();
        let body = self.build_request(&image, mime_type, prompt);

        let mut request = self
            .http_client
            .post(format!(
                "{}/v1/messages",
                self.config.base_url.trim_end_matches('/')
            ))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json");
        if self.config.structured_output {
            request = request.header("anthropic-beta", STRUCTURED_OUTPUTS_BETA);
        }

        let response = request.json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Provider("Claude Vision API request timed out".to_string())
            } else {
                AppError::Provider(format!("Failed to send request to Claude Vision API: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Provider(format!(
                "Claude Vision API request failed: {} - {}",
                status, error_text
            )));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            AppError::Provider(format!("Failed to parse Claude Vision API response: {}", e))
        })?;

        if let Some(usage) = &parsed.usage {
            tracing::debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Claude Vision token usage"
            );
        }

        let text = first_text(parsed)?;

        tracing::info!(
            model = %self.config.model,
            mime_type = %mime_type,
            size_bytes = image.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Claude Vision response received"
        );

        Ok(classify_reply(text, self.config.structured_output))
    }

    fn name(&self) -> &str {
        "claude_vision"
    }
}
