//! Error types module
//!
//! All failures surfaced by the pipeline are unified under [`AppError`]. Each variant
//! self-describes how it should be presented to a caller through [`ErrorMetadata`], so the
//! HTTP service and the tool server render failures consistently.

use crate::validation::ValidationError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like provider hiccups
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "STORAGE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage write failed: {0}")]
    StorageWrite(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Video processing timed out after {attempts} status checks. The video may be too large or complex.")]
    ProcessingTimeout { attempts: u32 },

    #[error("Video processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Invalid AI response: {0}")]
    ResponseFormat(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Validation(_) => (
            400,
            "VALIDATION_ERROR",
            false,
            Some("Check the media type and size and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::BadRequest(_) => (
            400,
            "BAD_REQUEST",
            false,
            Some("Check request format and parameters"),
            false,
            LogLevel::Debug,
        ),
        AppError::MethodNotAllowed(_) => (
            405,
            "METHOD_NOT_ALLOWED",
            false,
            Some("Use the documented HTTP method for this endpoint"),
            false,
            LogLevel::Debug,
        ),
        AppError::AccessDenied(_) => (
            403,
            "ACCESS_DENIED",
            false,
            Some("Request a fresh access URL"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the media key or URL exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::StorageWrite(_) => (
            500,
            "STORAGE_WRITE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Provider(_) => (
            502,
            "PROVIDER_ERROR",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Warn,
        ),
        AppError::ProcessingTimeout { .. } => (
            504,
            "PROCESSING_TIMEOUT",
            true,
            Some("Try a shorter or smaller video"),
            false,
            LogLevel::Warn,
        ),
        AppError::ProcessingFailed(_) => (
            502,
            "PROCESSING_FAILED",
            false,
            Some("Check that the video is playable and try again"),
            false,
            LogLevel::Warn,
        ),
        AppError::ResponseFormat(_) => (
            502,
            "RESPONSE_FORMAT_ERROR",
            true,
            Some("Retry the request"),
            false,
            LogLevel::Warn,
        ),
        AppError::Cancelled => (499, "CANCELLED", true, None, false, LogLevel::Debug),
        AppError::Config(_) => (
            500,
            "CONFIG_ERROR",
            false,
            Some("Contact the service operator"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Validation(_) => "Validation",
            AppError::BadRequest(_) => "BadRequest",
            AppError::MethodNotAllowed(_) => "MethodNotAllowed",
            AppError::AccessDenied(_) => "AccessDenied",
            AppError::NotFound(_) => "NotFound",
            AppError::StorageWrite(_) => "StorageWrite",
            AppError::Storage(_) => "Storage",
            AppError::Provider(_) => "Provider",
            AppError::ProcessingTimeout { .. } => "ProcessingTimeout",
            AppError::ProcessingFailed(_) => "ProcessingFailed",
            AppError::ResponseFormat(_) => "ResponseFormat",
            AppError::Cancelled => "Cancelled",
            AppError::Config(_) => "Config",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(ref err) => err.to_string(),
            AppError::BadRequest(ref msg) => msg.clone(),
            AppError::MethodNotAllowed(ref msg) => msg.clone(),
            AppError::AccessDenied(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::StorageWrite(_) => "Failed to store media".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Provider(ref msg) => msg.clone(),
            AppError::ProcessingTimeout { .. } => self.to_string(),
            AppError::ProcessingFailed(ref msg) => msg.clone(),
            AppError::ResponseFormat(ref msg) => format!("Invalid AI response: {}", msg),
            AppError::Cancelled => "Request cancelled".to_string(),
            AppError::Config(_) => "Service is not configured correctly".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;

    #[test]
    fn test_error_metadata_validation() {
        let err = AppError::from(ValidationError::UnsupportedMediaType {
            mime_type: "application/pdf".to_string(),
        });
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(!err.is_recoverable());
        assert!(err.client_message().contains("application/pdf"));
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_storage_is_sensitive() {
        let err = AppError::Storage("bucket credentials rejected".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Failed to access storage");
        assert!(!err.client_message().contains("credentials"));
    }

    #[test]
    fn test_error_metadata_timeout() {
        let err = AppError::ProcessingTimeout { attempts: 60 };
        assert_eq!(err.http_status_code(), 504);
        assert_eq!(err.error_code(), "PROCESSING_TIMEOUT");
        assert!(err.client_message().contains("60"));
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_size_error_message_mentions_ceiling() {
        let err = AppError::from(ValidationError::FileTooLarge {
            kind: MediaKind::Image,
            size: 11 * 1024 * 1024,
            max: 10 * 1024 * 1024,
        });
        let message = err.client_message();
        assert!(message.contains("11.00MB"), "{}", message);
        assert!(message.contains("10MB"), "{}", message);
        assert!(message.contains("images"), "{}", message);
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err = AppError::from(anyhow::anyhow!("disk full").context("writing object"));
        let details = err.detailed_message();
        assert!(details.contains("Caused by"));
        assert_eq!(err.error_type(), "Internal");
    }
}
