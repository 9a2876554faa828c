//! MCP tool request types with JSON Schema for AI parameter generation

use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateAdCopyRequest {
    #[serde(rename = "mediaUrl")]
    #[schemars(description = "Access URL of an uploaded image or video")]
    pub media_url: String,
    #[schemars(description = "Additional instructions for the copy (offer, audience, tone)")]
    pub text: Option<String>,
}
