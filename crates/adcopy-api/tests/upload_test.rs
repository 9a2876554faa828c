//! Upload and media-serving integration tests.
//!
//! Run with: `cargo test -p adcopy-api --test upload_test`

mod helpers;

use adcopy_core::AdCopyConfig;
use axum_test::multipart::MultipartForm;
use helpers::{
    file_form, path_of, png_bytes, setup_counting_app, setup_test_app, setup_test_app_with,
};
use serde_json::Value;

fn is_media_key(key: &str, extension: &str) -> bool {
    let Some(rest) = key.strip_prefix("media/") else {
        return false;
    };
    let Some((stem, ext)) = rest.rsplit_once('.') else {
        return false;
    };
    let Some((millis, uuid)) = stem.split_once('-') else {
        return false;
    };
    ext == extension
        && !millis.is_empty()
        && millis.chars().all(|c| c.is_ascii_digit())
        && uuid.len() == 36
}

#[tokio::test]
async fn test_upload_image_then_serve_it() {
    let app = setup_test_app().await;
    let client = app.client();

    let data = png_bytes(3 * 1024);
    let response = client
        .post("/upload")
        .multipart(file_form(data.clone(), "photo.png", "image/png"))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    let key = body["key"].as_str().expect("key");
    assert!(is_media_key(key, "png"), "unexpected key {}", key);
    let url = body["url"].as_str().expect("url");
    assert_eq!(url, format!("http://localhost:8787/files/{}", key));
    assert!(body["expiresAt"].as_str().is_some());

    let served = client.get(path_of(url)).await;
    assert_eq!(served.status_code(), 200);
    assert_eq!(served.header("content-type"), "image/png");
    assert_eq!(served.as_bytes().as_ref(), data.as_slice());
}

#[tokio::test]
async fn test_upload_normalizes_mime_type() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post("/upload")
        .multipart(file_form(vec![1u8; 64], "clip.MP4", "Video/MP4"))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert!(is_media_key(body["key"].as_str().unwrap(), "mp4"));
}

#[tokio::test]
async fn test_upload_rejects_unsupported_type() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post("/upload")
        .multipart(file_form(vec![1u8; 64], "doc.pdf", "application/pdf"))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["error_type"], "Validation");
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("application/pdf"), "{}", error);
    assert!(error.contains("image/jpeg"), "{}", error);
}

#[tokio::test]
async fn test_upload_rejects_oversized_image_before_storage_write() {
    let (app, storage) = setup_counting_app(AdCopyConfig {
        max_image_size_bytes: 10 * 1024 * 1024,
        ..AdCopyConfig::default()
    });

    let response = app
        .client()
        .post("/upload")
        .multipart(file_form(vec![0xFF; 11 * 1024 * 1024], "big.jpg", "image/jpeg"))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("(11.00MB)"), "{}", error);
    assert!(error.contains("exceeds maximum allowed size of 10MB for images"), "{}", error);
    assert_eq!(storage.put_count(), 0);

    let accepted = app
        .client()
        .post("/upload")
        .multipart(file_form(vec![0xFF; 3 * 1024 * 1024], "ok.jpg", "image/jpeg"))
        .await;
    assert_eq!(accepted.status_code(), 200);
    assert_eq!(storage.put_count(), 1);
}

#[tokio::test]
async fn test_upload_far_past_ceiling_is_size_error() {
    let (app, storage) = setup_counting_app(AdCopyConfig {
        max_image_size_bytes: 1024 * 1024,
        max_video_size_bytes: 1024 * 1024,
        ..AdCopyConfig::default()
    });

    let response = app
        .client()
        .post("/upload")
        .multipart(file_form(vec![0u8; 3 * 1024 * 1024], "clip.mp4", "video/mp4"))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("exceeds maximum allowed size of 1MB for videos"), "{}", error);
    assert_eq!(storage.put_count(), 0);
}

#[tokio::test]
async fn test_upload_rejects_empty_file() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post("/upload")
        .multipart(file_form(Vec::new(), "empty.png", "image/png"))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let app = setup_test_app().await;
    let form = MultipartForm::new().add_text("note", "no file here");
    let response = app.client().post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No file provided");
}

#[tokio::test]
async fn test_upload_rejects_other_methods() {
    let app = setup_test_app().await;
    let response = app.client().get("/upload").await;

    assert_eq!(response.status_code(), 405);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "METHOD_NOT_ALLOWED");
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .get("/files/media/1700000000000-00000000-0000-0000-0000-000000000000.png")
        .await;

    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_signed_urls_are_enforced() {
    let app = setup_test_app_with(AdCopyConfig {
        access_url_signing_secret: Some(helpers::TEST_SIGNING_SECRET.to_string()),
        ..AdCopyConfig::default()
    })
    .await;
    let client = app.client();

    let response = client
        .post("/upload")
        .multipart(file_form(png_bytes(128), "photo.png", "image/png"))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    let key = body["key"].as_str().unwrap();
    let url = body["url"].as_str().unwrap();
    assert!(url.contains("signature="), "{}", url);

    let unsigned = client.get(&format!("/files/{}", key)).await;
    assert_eq!(unsigned.status_code(), 403);

    let tampered = client
        .get(&format!("/files/{}?expires=9999999999&signature=AAAA", key))
        .await;
    assert_eq!(tampered.status_code(), 403);

    let signed = client.get(path_of(url)).await;
    assert_eq!(signed.status_code(), 200);
    assert_eq!(signed.header("content-type"), "image/png");
}
