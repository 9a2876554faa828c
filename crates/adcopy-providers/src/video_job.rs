//! Video job state machine
//!
//! `UPLOADED -> PROCESSING -> {ACTIVE | FAILED}`. A job is polled while it is still in
//! flight (`UPLOADED` or `PROCESSING`) and fewer than `max_attempts` status checks have been
//! made. The loop therefore issues at most `max_attempts` polls and always leaves the job
//! `ACTIVE`, `FAILED`, or in flight with the budget spent; [`VideoJobManager::settle`] turns
//! the last two into errors.

use std::sync::Arc;
use std::time::Duration;

use adcopy_core::{normalize, AdCopyResult, AppError, Config, VideoJobState, VideoProcessingJob};
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::cancel::cancellable;
use crate::clock::Sleeper;
use crate::traits::{RemoteFile, VideoProvider};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2_000);
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

impl PollPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: Duration::from_millis(config.video_poll_interval_ms()),
            max_attempts: config.video_max_poll_attempts(),
        }
    }
}

/// A job that reached `ACTIVE` with a usable file reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVideo {
    pub remote_id: String,
    pub uri: String,
    pub mime_type: String,
    pub poll_attempts: u32,
}

#[derive(Clone)]
pub struct VideoJobManager {
    provider: Arc<dyn VideoProvider>,
    sleeper: Arc<dyn Sleeper>,
    policy: PollPolicy,
}

fn apply_status(job: &mut VideoProcessingJob, file: RemoteFile) {
    job.state = VideoJobState::from_provider(&file.state);
    job.uri = file.uri;
    job.resolved_mime_type = file.mime_type;
}

fn is_in_flight(state: VideoJobState) -> bool {
    matches!(state, VideoJobState::Uploaded | VideoJobState::Processing)
}

impl VideoJobManager {
    pub fn new(provider: Arc<dyn VideoProvider>, sleeper: Arc<dyn Sleeper>, policy: PollPolicy) -> Self {
        Self {
            provider,
            sleeper,
            policy,
        }
    }

    /// Stage the video with the provider. The job starts in whatever state the provider reports.
    pub async fn submit(&self, data: Bytes, mime_type: &str) -> Result<VideoProcessingJob, AppError> {
        let file = self.provider.upload(data, mime_type).await?;

        let mut job = VideoProcessingJob {
            remote_id: file.name.clone(),
            state: VideoJobState::Processing,
            uri: None,
            resolved_mime_type: None,
            poll_attempts: 0,
        };
        apply_status(&mut job, file);

        tracing::debug!(remote_id = %job.remote_id, state = ?job.state, "Video job submitted");
        Ok(job)
    }

    /// Poll until the job leaves the in-flight states or the attempt budget is spent.
    pub async fn poll(
        &self,
        mut job: VideoProcessingJob,
        cancel: &CancellationToken,
    ) -> Result<VideoProcessingJob, AppError> {
        while is_in_flight(job.state) && job.poll_attempts < self.policy.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(
                        remote_id = %job.remote_id,
                        attempt = job.poll_attempts,
                        "Video polling cancelled"
                    );
                    return Err(AppError::Cancelled);
                }
                _ = self.sleeper.sleep(self.policy.interval) => {}
            }

            let file = cancellable(cancel, self.provider.get_file(&job.remote_id)).await?;
            apply_status(&mut job, file);
            job.poll_attempts += 1;

            tracing::debug!(
                remote_id = %job.remote_id,
                attempt = job.poll_attempts,
                state = ?job.state,
                "Video job status checked"
            );
        }

        Ok(job)
    }

    /// Post-loop policy: only an `ACTIVE` job with both URI and MIME type is usable.
    pub fn settle(&self, job: VideoProcessingJob) -> Result<ActiveVideo, AppError> {
        match job.state {
            VideoJobState::Failed => Err(AppError::ProcessingFailed(
                "Video processing failed on Gemini side.".to_string(),
            )),
            VideoJobState::Uploaded | VideoJobState::Processing => {
                tracing::warn!(
                    remote_id = %job.remote_id,
                    attempts = job.poll_attempts,
                    "Video processing poll budget exhausted"
                );
                Err(AppError::ProcessingTimeout {
                    attempts: job.poll_attempts,
                })
            }
            VideoJobState::Active => {
                let (uri, mime_type) = job.usable_reference().ok_or_else(|| {
                    AppError::Provider("Uploaded file is missing URI or MIME type.".to_string())
                })?;
                Ok(ActiveVideo {
                    remote_id: job.remote_id.clone(),
                    uri: uri.to_string(),
                    mime_type: mime_type.to_string(),
                    poll_attempts: job.poll_attempts,
                })
            }
        }
    }

    pub async fn generate(&self, video: &ActiveVideo, prompt: &str) -> Result<AdCopyResult, AppError> {
        let text = self
            .provider
            .generate_content(&video.uri, &video.mime_type, prompt)
            .await?;

        if text.trim().is_empty() {
            return Err(AppError::Provider("Empty response from Gemini API".to_string()));
        }

        normalize(&text)
    }

    /// Submit, poll, settle, and generate in one request-scoped run.
    pub async fn process(
        &self,
        data: Bytes,
        mime_type: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<AdCopyResult, AppError> {
        let start = std::time::Instant::now();

        let job = cancellable(cancel, self.submit(data, mime_type)).await?;
        let job = self.poll(job, cancel).await?;
        let video = self.settle(job)?;

        tracing::info!(
            remote_id = %video.remote_id,
            attempts = video.poll_attempts,
            "Video processed, generating ad copy"
        );

        let result = cancellable(cancel, self.generate(&video, prompt)).await?;

        tracing::info!(
            remote_id = %video.remote_id,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Video ad copy generated"
        );

        Ok(result)
    }
}
