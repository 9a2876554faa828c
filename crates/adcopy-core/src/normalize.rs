//! Response normalization for model output.
//!
//! Providers either hand back an already-structured result (schema-constrained modes) or
//! free text that is expected to contain a JSON object, optionally wrapped in a fenced
//! code block with or without a language tag. Both paths converge on [`normalize_output`].

use serde::Deserialize;

use crate::error::AppError;
use crate::models::AdCopyResult;

const FENCE: &str = "```";

/// What a provider returned before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutput {
    /// Output the provider guarantees matches the two-field schema.
    Structured(AdCopyResult),
    /// Free text that still needs fence stripping and parsing.
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawAdCopy {
    #[serde(default)]
    headline: Option<String>,
    #[serde(default, rename = "primaryText")]
    primary_text: Option<String>,
}

pub fn normalize_output(output: ProviderOutput) -> Result<AdCopyResult, AppError> {
    match output {
        ProviderOutput::Structured(result) => {
            if result.is_complete() {
                Ok(result)
            } else {
                Err(missing_fields())
            }
        }
        ProviderOutput::Text(text) => normalize(&text),
    }
}

/// Strip an optional fence, parse, and require both fields to be non-empty.
pub fn normalize(raw_text: &str) -> Result<AdCopyResult, AppError> {
    let body = strip_fence(raw_text);

    let parsed: RawAdCopy = serde_json::from_str(body)
        .map_err(|e| AppError::ResponseFormat(format!("response is not valid JSON: {}", e)))?;

    let headline = parsed.headline.filter(|h| !h.trim().is_empty());
    let primary_text = parsed.primary_text.filter(|p| !p.trim().is_empty());

    match (headline, primary_text) {
        (Some(headline), Some(primary_text)) => Ok(AdCopyResult {
            headline,
            primary_text,
        }),
        _ => Err(missing_fields()),
    }
}

fn missing_fields() -> AppError {
    AppError::ResponseFormat("missing headline or primaryText fields".to_string())
}

/// Remove a surrounding fenced block if present. Unfenced text is returned trimmed.
pub fn strip_fence(raw_text: &str) -> &str {
    let trimmed = raw_text.trim();
    let Some(after_open) = trimmed.strip_prefix(FENCE) else {
        return trimmed;
    };

    // Language tag, e.g. "json" or "JSON5"; possibly empty.
    let tag_len = after_open
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(after_open.len());
    let body = &after_open[tag_len..];
    let body = body.strip_suffix(FENCE).unwrap_or(body);

    body.trim()
}
