use axum::Json;
use serde_json::{json, Value};

/// Service name, version, and the endpoint map.
pub async fn service_index() -> Json<Value> {
    Json(json!({
        "service": "adcopy-api",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /upload (multipart/form-data, field: file)",
            "files": "GET /files/{key}",
            "health": "GET /health/config",
        }
    }))
}
