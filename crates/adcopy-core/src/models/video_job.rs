use serde::{Deserialize, Serialize};

/// Lifecycle states reported by the video provider's file-staging API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoJobState {
    Uploaded,
    Processing,
    Active,
    Failed,
}

impl VideoJobState {
    /// Parse a provider state string. Anything unrecognised (including
    /// `STATE_UNSPECIFIED`) is treated as still in flight.
    pub fn from_provider(state: &str) -> Self {
        match state.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => VideoJobState::Active,
            "FAILED" => VideoJobState::Failed,
            "UPLOADED" => VideoJobState::Uploaded,
            _ => VideoJobState::Processing,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoJobState::Active | VideoJobState::Failed)
    }
}

/// Request-scoped handle on a video staged with the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoProcessingJob {
    pub remote_id: String,
    pub state: VideoJobState,
    pub uri: Option<String>,
    pub resolved_mime_type: Option<String>,
    pub poll_attempts: u32,
}

impl VideoProcessingJob {
    /// The `(uri, mime_type)` pair needed to reference the file, if both are non-empty.
    pub fn usable_reference(&self) -> Option<(&str, &str)> {
        let uri = self.uri.as_deref().filter(|s| !s.trim().is_empty())?;
        let mime = self
            .resolved_mime_type
            .as_deref()
            .filter(|s| !s.trim().is_empty())?;
        Some((uri, mime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_provider() {
        assert_eq!(VideoJobState::from_provider("ACTIVE"), VideoJobState::Active);
        assert_eq!(VideoJobState::from_provider("FAILED"), VideoJobState::Failed);
        assert_eq!(
            VideoJobState::from_provider("STATE_UNSPECIFIED"),
            VideoJobState::Processing
        );
        assert!(!VideoJobState::Uploaded.is_terminal());
    }

    #[test]
    fn test_usable_reference_requires_both_fields() {
        let mut job = VideoProcessingJob {
            remote_id: "files/abc".to_string(),
            state: VideoJobState::Active,
            uri: Some("https://example.test/files/abc".to_string()),
            resolved_mime_type: None,
            poll_attempts: 0,
        };
        assert!(job.usable_reference().is_none());
        job.resolved_mime_type = Some("video/mp4".to_string());
        assert_eq!(
            job.usable_reference(),
            Some(("https://example.test/files/abc", "video/mp4"))
        );
        job.uri = Some(String::new());
        assert!(job.usable_reference().is_none());
    }
}
