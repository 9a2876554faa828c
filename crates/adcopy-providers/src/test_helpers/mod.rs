//! Test doubles for the provider traits
//!
//! Scripted providers return canned responses and record what they were asked, so the
//! pipeline can be exercised end to end without network access or real waiting.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use adcopy_core::{AppError, ProviderOutput};
use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::clock::Sleeper;
use crate::traits::{RemoteFile, VideoProvider, VisionProvider};

pub const SCRIPTED_AD_COPY_JSON: &str =
    r#"{"headline":"Scripted headline","primaryText":"Scripted primary text"}"#;

/// One recorded call to [`StaticVisionProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionCall {
    pub mime_type: String,
    pub prompt: String,
    pub size_bytes: usize,
}

enum VisionReply {
    Output(ProviderOutput),
    Error(String),
}

/// Vision provider that always returns the same reply.
pub struct StaticVisionProvider {
    reply: VisionReply,
    calls: Mutex<Vec<VisionCall>>,
}

impl StaticVisionProvider {
    pub fn new(output: ProviderOutput) -> Self {
        Self {
            reply: VisionReply::Output(output),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn text(text: &str) -> Self {
        Self::new(ProviderOutput::Text(text.to_string()))
    }

    /// Fail every call with a provider error carrying `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            reply: VisionReply::Error(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<VisionCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl VisionProvider for StaticVisionProvider {
    async fn describe_image(
        &self,
        image: Bytes,
        mime_type: &str,
        prompt: &str,
    ) -> Result<ProviderOutput, AppError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(VisionCall {
                mime_type: mime_type.to_string(),
                prompt: prompt.to_string(),
                size_bytes: image.len(),
            });

        match &self.reply {
            VisionReply::Output(output) => Ok(output.clone()),
            VisionReply::Error(message) => Err(AppError::Provider(message.clone())),
        }
    }

    fn name(&self) -> &str {
        "static_vision"
    }
}

/// Video provider driven by a queue of file states.
///
/// `upload` reports the initial file. Each `get_file` pops the next scripted file; once the
/// script runs dry the last reported file is repeated.
pub struct ScriptedVideoProvider {
    initial: RemoteFile,
    script: Mutex<VecDeque<RemoteFile>>,
    last: Mutex<Option<RemoteFile>>,
    generated_text: String,
    uploads: AtomicU32,
    polls: AtomicU32,
    generate_calls: Mutex<Vec<(String, String, String)>>,
}

impl ScriptedVideoProvider {
    pub fn new(initial: RemoteFile) -> Self {
        Self {
            initial,
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            generated_text: SCRIPTED_AD_COPY_JSON.to_string(),
            uploads: AtomicU32::new(0),
            polls: AtomicU32::new(0),
            generate_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn file(name: &str, state: &str) -> RemoteFile {
        RemoteFile {
            name: name.to_string(),
            state: state.to_string(),
            uri: None,
            mime_type: None,
        }
    }

    pub fn processing(name: &str) -> RemoteFile {
        Self::file(name, "PROCESSING")
    }

    pub fn active(name: &str, uri: &str, mime_type: &str) -> RemoteFile {
        RemoteFile {
            name: name.to_string(),
            state: "ACTIVE".to_string(),
            uri: Some(uri.to_string()),
            mime_type: Some(mime_type.to_string()),
        }
    }

    /// Queue the next status reported by `get_file`.
    pub fn then(mut self, file: RemoteFile) -> Self {
        self.script
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(file);
        self
    }

    pub fn with_generated_text(mut self, text: &str) -> Self {
        self.generated_text = text.to_string();
        self
    }

    pub fn upload_count(&self) -> u32 {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn poll_count(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    /// `(uri, mime_type, prompt)` for every generate call.
    pub fn generate_calls(&self) -> Vec<(String, String, String)> {
        self.generate_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl VideoProvider for ScriptedVideoProvider {
    async fn upload(&self, _data: Bytes, _mime_type: &str) -> Result<RemoteFile, AppError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(self.initial.clone());
        Ok(self.initial.clone())
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile, AppError> {
        self.polls.fetch_add(1, Ordering::SeqCst);

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let file = match next {
            Some(file) => file,
            None => last
                .clone()
                .ok_or_else(|| AppError::NotFound(format!("No such file: {}", name)))?,
        };
        *last = Some(file.clone());
        Ok(file)
    }

    async fn generate_content(
        &self,
        file_uri: &str,
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, AppError> {
        self.generate_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((file_uri.to_string(), mime_type.to_string(), prompt.to_string()));
        Ok(self.generated_text.clone())
    }

    fn name(&self) -> &str {
        "scripted_video"
    }
}

/// Sleeper that returns immediately and remembers every requested duration.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
    cancel_at: Mutex<Option<(usize, CancellationToken)>>,
}

impl RecordingSleeper {
    /// Cancel `token` during the `nth` sleep (1-based).
    pub fn cancel_after(&self, nth: usize, token: CancellationToken) {
        *self.cancel_at.lock().unwrap_or_else(PoisonError::into_inner) = Some((nth, token));
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        let count = {
            let mut sleeps = self.sleeps.lock().unwrap_or_else(PoisonError::into_inner);
            sleeps.push(duration);
            sleeps.len()
        };

        if let Some((nth, token)) = &*self.cancel_at.lock().unwrap_or_else(PoisonError::into_inner) {
            if count >= *nth {
                token.cancel();
            }
        }

        tokio::task::yield_now().await;
    }
}
