//! Gemini Files API + generateContent client for video ad copy.
//!
//! Videos are staged with a resumable upload (start, then `upload, finalize`), polled by
//! file name, and finally referenced by URI from a generateContent request.

use adcopy_core::{AppError, Config};
use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::traits::{RemoteFile, VideoProvider};

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

#[derive(Clone)]
pub struct GeminiVideoConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Debug for GeminiVideoConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiVideoConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiVideoConfig {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let api_key = config
            .gemini_api_key()
            .ok_or_else(|| AppError::Config("GEMINI_API_KEY not configured".to_string()))?;

        Ok(Self {
            api_key: api_key.to_string(),
            model: config.gemini_model().to_string(),
            base_url: config.gemini_base_url().to_string(),
            timeout: Duration::from_secs(config.provider_timeout_secs()),
        })
    }
}

pub struct GeminiVideoClient {
    http_client: reqwest::Client,
    config: GeminiVideoConfig,
}

impl Debug for GeminiVideoClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiVideoClient")
            .field("config", &self.config)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: GeminiFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFile {
    name: String,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

impl From<GeminiFile> for RemoteFile {
    fn from(file: GeminiFile) -> Self {
        RemoteFile {
            name: file.name,
            state: file.state.unwrap_or_else(|| "STATE_UNSPECIFIED".to_string()),
            uri: file.uri,
            mime_type: file.mime_type,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

impl GeminiVideoClient {
    pub fn new(config: GeminiVideoConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client for Gemini")?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    async fn error_for(response: reqwest::Response, what: &str) -> AppError {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        AppError::Provider(format!("Gemini {} failed: {} - {}", what, status, error_text))
    }

    async fn start_upload(&self, size: usize, mime_type: &str) -> Result<String, AppError> {
        let response = self
            .http_client
            .post(format!("{}/upload/v1beta/files", self.base()))
            .header(API_KEY_HEADER, &self.config.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({"file": {"display_name": "video"}}))
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to start Gemini upload: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, "upload start").await);
        }

        response
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| AppError::Provider("Missing X-Goog-Upload-URL header".to_string()))
    }
}

#[async_trait]
impl VideoProvider for GeminiVideoClient {
    async fn upload(&self, data: Bytes, mime_type: &str) -> Result<RemoteFile, AppError> {
        let start = std::time::Instant::now();
        let size = data.len();
        let upload_url = self.start_upload(size, mime_type).await?;

        let response = self
            .http_client
            .post(&upload_url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", "0")
            .header("content-type", mime_type)
            .body(data)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to upload video to Gemini: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, "upload finalize").await);
        }

        let uploaded: UploadResponse = response.json().await.map_err(|e| {
            AppError::Provider(format!("Failed to parse Gemini upload response: {}", e))
        })?;
        let file = RemoteFile::from(uploaded.file);

        tracing::info!(
            remote_id = %file.name,
            state = %file.state,
            size_bytes = size as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Video uploaded to Gemini Files API"
        );

        Ok(file)
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile, AppError> {
        let response = self
            .http_client
            .get(format!("{}/v1beta/{}", self.base(), name))
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to poll Gemini file status: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, "file status check").await);
        }

        let file: GeminiFile = response.json().await.map_err(|e| {
            AppError::Provider(format!("Failed to parse Gemini file status: {}", e))
        })?;

        Ok(file.into())
    }

    async fn generate_content(
        &self,
        file_uri: &str,
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, AppError> {
        let start = std::time::Instant::now();
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::FileData {
                        file_data: FileData {
                            mime_type: mime_type.to_string(),
                            file_uri: file_uri.to_string(),
                        },
                    },
                ],
            }],
        };

        let response = self
            .http_client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base(),
                self.config.model
            ))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to call Gemini generateContent: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, "generateContent").await);
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            AppError::Provider(format!("Failed to parse Gemini generateContent response: {}", e))
        })?;

        tracing::info!(
            model = %self.config.model,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Gemini generateContent response received"
        );

        Ok(parsed.text())
    }

    fn name(&self) -> &str {
        "gemini_video"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(base_url: String) -> GeminiVideoClient {
        GeminiVideoClient::new(GeminiVideoConfig {
            api_key: "gm-test-key".to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
            base_url,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_resumable_upload() {
        let mut server = mockito::Server::new_async().await;
        let session_url = format!("{}/upload-session/abc", server.url());

        let start = server
            .mock("POST", "/upload/v1beta/files")
            .match_header("x-goog-api-key", "gm-test-key")
            .match_header("x-goog-upload-protocol", "resumable")
            .match_header("x-goog-upload-command", "start")
            .match_header("x-goog-upload-header-content-length", "4")
            .match_header("x-goog-upload-header-content-type", "video/mp4")
            .with_status(200)
            .with_header("x-goog-upload-url", &session_url)
            .create_async()
            .await;

        let finalize = server
            .mock("POST", "/upload-session/abc")
            .match_header("x-goog-upload-command", "upload, finalize")
            .match_header("x-goog-upload-offset", "0")
            .match_body("abcd")
            .with_status(200)
            .with_body(
                json!({"file": {"name": "files/abc", "mimeType": "video/mp4", "state": "PROCESSING"}})
                    .to_string(),
            )
            .create_async()
            .await;

        let file = client(server.url())
            .upload(Bytes::from_static(b"abcd"), "video/mp4")
            .await
            .unwrap();

        start.assert_async().await;
        finalize.assert_async().await;
        assert_eq!(file.name, "files/abc");
        assert_eq!(file.state, "PROCESSING");
        assert!(file.uri.is_none());
    }

    #[tokio::test]
    async fn test_upload_without_session_header() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload/v1beta/files")
            .with_status(200)
            .create_async()
            .await;

        let err = client(server.url())
            .upload(Bytes::from_static(b"abcd"), "video/mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Provider(_)));
    }

    #[tokio::test]
    async fn test_get_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1beta/files/abc")
            .with_status(200)
            .with_body(
                json!({
                    "name": "files/abc",
                    "uri": "https://generativelanguage.googleapis.com/v1beta/files/abc",
                    "mimeType": "video/mp4",
                    "state": "ACTIVE"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let file = client(server.url()).get_file("files/abc").await.unwrap();
        assert_eq!(file.state, "ACTIVE");
        assert_eq!(file.mime_type.as_deref(), Some("video/mp4"));
    }

    #[tokio::test]
    async fn test_generate_content_references_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.0-flash-exp:generateContent")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"\{"text":"prompt"\}"#.to_string()),
                Matcher::Regex(
                    r#""fileData":\{"mimeType":"video/mp4","fileUri":"https://files/abc"\}"#
                        .to_string(),
                ),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "candidates": [{
                        "content": {"parts": [{"text": "```json\n{\"headline\":"}, {"text": "\"H\",\"primaryText\":\"P\"}\n```"}]}
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let text = client(server.url())
            .generate_content("https://files/abc", "video/mp4", "prompt")
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(text.starts_with("```json"));
        assert!(text.contains("\"primaryText\":\"P\""));
    }

    #[tokio::test]
    async fn test_generate_content_empty_candidates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1beta/models/gemini-2.0-flash-exp:generateContent")
            .with_status(200)
            .with_body(json!({"candidates": []}).to_string())
            .create_async()
            .await;

        let text = client(server.url())
            .generate_content("https://files/abc", "video/mp4", "prompt")
            .await
            .unwrap();
        assert!(text.is_empty());
    }
}
