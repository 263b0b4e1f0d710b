//! a2f2d - Audio2Face-2D streaming client
//!
//! Streams speech audio and a portrait to a remote animation service over
//! one bidirectional gRPC call and writes the returned MP4 as it arrives.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod input;
pub mod proto;
pub mod relay;
pub mod session;
pub mod transport;

// Core seams (transport → session → sinks)
pub use session::{SessionController, SessionReport, VideoSink};
pub use transport::{AnimateTransport, GrpcTransport, ScriptedTransport};

// Error handling
pub use error::{A2f2dError, FailureCategory, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
