use serde::{Deserialize, Serialize};

use super::MediaKind;

/// The two-field marketing copy produced for a piece of media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdCopyResult {
    pub headline: String,
    pub primary_text: String,
}

impl AdCopyResult {
    pub fn new(headline: impl Into<String>, primary_text: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            primary_text: primary_text.into(),
        }
    }

    /// Both fields carry non-whitespace text.
    pub fn is_complete(&self) -> bool {
        !self.headline.trim().is_empty() && !self.primary_text.trim().is_empty()
    }

    /// Plain-text rendering used by the tool entry point.
    pub fn render(&self, kind: MediaKind) -> String {
        format!(
            "{} AD COPY GENERATED\n\nHEADLINE:\n{}\n\nPRIMARY TEXT:\n{}",
            kind.as_str().to_uppercase(),
            self.headline,
            self.primary_text
        )
    }
}
