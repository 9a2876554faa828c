//! Upload entry point
//!
//! Accepts one multipart `file` field, applies the media policy (type, then size) before
//! anything is written, stores the bytes, and returns an access descriptor.

use std::sync::Arc;

use adcopy_core::validation::{check_size, normalize_mime, require_supported};
use adcopy_core::{AppError, MediaKind, SizeLimits, ValidationError};
use axum::{
    extract::{multipart::Field, Multipart, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::HttpAppError;
use crate::state::AppState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
    pub key: String,
    pub expires_at: DateTime<Utc>,
}

struct UploadedFile {
    data: Bytes,
    mime_type: String,
    kind: MediaKind,
    filename: Option<String>,
}

/// Find the `file` field, classify it from its declared type, then stream it in while
/// enforcing the per-kind ceiling. Nothing beyond the ceiling is buffered.
async fn read_file_field(
    multipart: &mut Multipart,
    limits: &SizeLimits,
) -> Result<Option<UploadedFile>, HttpAppError> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let mime_type = normalize_mime(field.content_type().unwrap_or("application/octet-stream"));
        let kind = require_supported(&mime_type)?;
        let filename = field.file_name().map(String::from);
        let max = limits.for_kind(kind);

        let mut buffer = BytesMut::new();
        let mut size_bytes: u64 = 0;
        while let Some(chunk) = field.chunk().await? {
            size_bytes += chunk.len() as u64;
            if size_bytes > max {
                size_bytes += drain_remaining(&mut field).await;
                return Err(ValidationError::FileTooLarge {
                    kind,
                    size: size_bytes,
                    max,
                }
                .into());
            }
            buffer.extend_from_slice(&chunk);
        }

        return Ok(Some(UploadedFile {
            data: buffer.freeze(),
            mime_type,
            kind,
            filename,
        }));
    }
    Ok(None)
}

/// Count the rest of an oversized field so the error can report its full size. Stops at
/// the transport limit.
async fn drain_remaining(field: &mut Field<'_>) -> u64 {
    let mut remaining = 0u64;
    while let Ok(Some(chunk)) = field.chunk().await {
        remaining += chunk.len() as u64;
    }
    remaining
}

/// Upload media handler
///
/// # Errors
/// - `AppError::BadRequest` - No `file` field or malformed multipart body (400)
/// - `AppError::Validation` - Unsupported type, empty file, or over the size ceiling (400)
/// - `AppError::StorageWrite` - Backend write failure (500)
#[tracing::instrument(skip_all, fields(operation = "upload_media"))]
pub async fn upload_media(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let UploadedFile {
        data,
        mime_type,
        kind,
        filename,
    } = read_file_field(&mut multipart, &state.limits)
        .await?
        .ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    let size_bytes = data.len() as u64;
    check_size(kind, size_bytes, &state.limits)?;

    tracing::debug!(
        kind = %kind,
        mime_type = %mime_type,
        size_bytes = size_bytes,
        filename = ?filename,
        "Upload accepted"
    );

    let stored = state.gateway.store(data, &mime_type).await?;
    let descriptor = state.gateway.build_access_url(&stored.key)?;

    let body = UploadResponse {
        success: true,
        url: descriptor.url,
        key: descriptor.key,
        expires_at: descriptor.expires_at,
    };

    Ok((StatusCode::OK, Json(body)).into_response())
}

/// Any method other than POST on the upload route.
pub async fn method_not_allowed(method: Method) -> HttpAppError {
    HttpAppError(AppError::MethodNotAllowed(format!(
        "Method {} not allowed; use POST",
        method
    )))
}
