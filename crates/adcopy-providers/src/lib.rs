//! Ad Copy Providers
//!
//! Generative-model boundaries for the pipeline: the provider traits, HTTP clients for
//! Anthropic (images) and Gemini (videos), the Vision Invoker, and the Video Job Manager.
//!
//! # Feature Flags
//!
//! - `provider-claude-vision`: Anthropic Messages API client
//! - `provider-gemini-video`: Gemini Files API + generateContent client
//! - `test-helpers`: scripted providers and a recording sleeper for tests

pub mod cancel;
pub mod clock;
pub mod traits;
pub mod video_job;
pub mod vision;

#[cfg(feature = "provider-claude-vision")]
pub mod claude_vision;
#[cfg(feature = "provider-gemini-video")]
pub mod gemini_video;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use cancel::cancellable;
pub use clock::{Sleeper, TokioSleeper};
pub use traits::{RemoteFile, VideoProvider, VisionProvider};
pub use video_job::{ActiveVideo, PollPolicy, VideoJobManager};
pub use vision::VisionInvoker;

#[cfg(feature = "provider-claude-vision")]
pub use claude_vision::{ClaudeVisionClient, ClaudeVisionConfig};
#[cfg(feature = "provider-gemini-video")]
pub use gemini_video::{GeminiVideoClient, GeminiVideoConfig};

// Re-export for downstream cancellation wiring
pub use tokio_util::sync::CancellationToken;
