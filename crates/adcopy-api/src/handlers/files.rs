use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
};
use serde::Deserialize;

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FileAccessQuery {
    pub expires: Option<String>,
    pub signature: Option<String>,
}

/// Serve stored bytes under their recorded content type.
///
/// When URL signing is configured the `expires` and `signature` query parameters must be
/// present, match the key, and not be in the past.
#[tracing::instrument(skip_all, fields(key = %key))]
pub async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<FileAccessQuery>,
) -> Result<Response, HttpAppError> {
    state
        .gateway
        .verify_access(&key, query.expires.as_deref(), query.signature.as_deref())
        .inspect_err(|e| tracing::debug!(error = %e, "Access URL rejected"))?;

    let (data, stored) = state.gateway.fetch_with_metadata(&key).await?;

    let cache_control = if state.gateway.requires_signature() {
        "private, max-age=3600"
    } else {
        "public, max-age=31536000, immutable"
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, stored.mime_type)
        .header(header::CONTENT_LENGTH, data.len())
        .header(header::CACHE_CONTROL, cache_control)
        .body(Body::from(data))
        .map_err(|e| HttpAppError::from(anyhow::anyhow!("Failed to build response: {}", e)))
}
