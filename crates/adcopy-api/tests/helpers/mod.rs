//! Shared setup for API integration tests. Every app runs on in-memory storage.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use adcopy_api::AppState;
use adcopy_core::{AdCopyConfig, Config, StorageBackend};
use adcopy_storage::{
    ObjectAttributes, ObjectMetadata, S3Storage, Storage, StorageGateway, StorageResult,
    StoredObject,
};
use async_trait::async_trait;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use bytes::Bytes;

pub const TEST_SIGNING_SECRET: &str = "test-signing-secret-at-least-32-characters";

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(AdCopyConfig::default()).await
}

pub async fn setup_test_app_with(config: AdCopyConfig) -> TestApp {
    let config = Config(Box::new(config));
    let (state, app) = adcopy_api::setup::initialize_app(config)
        .await
        .expect("Failed to initialize app");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");
    TestApp { server, state }
}

/// In-memory storage that counts writes.
pub struct CountingStorage {
    inner: S3Storage,
    puts: AtomicUsize,
}

impl CountingStorage {
    pub fn new() -> Self {
        Self {
            inner: S3Storage::in_memory(),
            puts: AtomicUsize::new(0),
        }
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for CountingStorage {
    async fn put(&self, key: &str, data: Bytes, attributes: ObjectAttributes) -> StorageResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, data, attributes).await
    }

    async fn get(&self, key: &str) -> StorageResult<Option<StoredObject>> {
        self.inner.get(key).await
    }

    async fn head(&self, key: &str) -> StorageResult<Option<ObjectMetadata>> {
        self.inner.head(key).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.inner.delete(key).await
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }
}

/// App over a [`CountingStorage`] so tests can assert whether anything was written.
pub fn setup_counting_app(config: AdCopyConfig) -> (TestApp, Arc<CountingStorage>) {
    let config = Config(Box::new(config));
    let storage = Arc::new(CountingStorage::new());
    let gateway = StorageGateway::new(
        storage.clone(),
        config.public_base_url(),
        config.signed_url_expiration_seconds(),
    );
    let state = Arc::new(AppState::new(config.clone(), gateway));
    let app = adcopy_api::setup::routes::setup_routes(&config, state.clone())
        .expect("Failed to setup routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");
    (TestApp { server, state }, storage)
}

/// Smallest valid PNG header; content is never decoded.
pub fn png_bytes(len: usize) -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.resize(len.max(8), 0);
    data
}

pub fn file_form(data: Vec<u8>, file_name: &str, mime_type: &str) -> MultipartForm {
    let part = Part::bytes(bytes::Bytes::from(data))
        .file_name(file_name.to_string())
        .mime_type(mime_type.to_string());
    MultipartForm::new().add_part("file", part)
}

/// Path and query of an absolute access URL, for replaying it against the test server.
pub fn path_of(url: &str) -> &str {
    let after_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    after_scheme
        .find('/')
        .map(|idx| &after_scheme[idx..])
        .unwrap_or("/")
}
