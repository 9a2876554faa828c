//! Ad Copy HTTP API
//!
//! Upload entry point, stored-media serving, and the service's informational endpoints.

pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
