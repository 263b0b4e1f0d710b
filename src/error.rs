//! Error types for a2f2d.

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum A2f2dError {
    // Input validation errors
    #[error("Input file not found: {path}")]
    InputNotFound { path: String },

    #[error("Missing required input: {what}")]
    MissingInput { what: String },

    #[error("Failed to read {path}: {message}")]
    InputRead { path: String, message: String },

    #[error("Failed to parse {path} at line {line}: {message}")]
    PoseTableParse {
        path: String,
        line: usize,
        message: String,
    },

    #[error(
        "Input audio file format must match the audio format: file extension '{extension}', audio format '{format}'"
    )]
    AudioFormatMismatch { format: String, extension: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("--ssl-mode {mode} requires {flag}")]
    MissingCredential { mode: String, flag: String },

    #[error("Invalid credential file {path}: {message}")]
    InvalidCredential { path: String, message: String },

    #[error("Failed to start relay server on port {port}: {message}")]
    RelayBind { port: u16, message: String },

    // Transport errors
    #[error("Connection to {target} failed: {message}")]
    Connect { target: String, message: String },

    #[error("Stream transport failed: {message}")]
    Transport { message: String },

    // Server-reported errors
    #[error("Server returned {code:?}: {message}")]
    Rpc { code: tonic::Code, message: String },

    // Local I/O errors while streaming
    #[error("Failed to read audio source {path}: {message}")]
    AudioRead { path: String, message: String },

    #[error("Failed to write video to {sink}: {message}")]
    SinkWrite { sink: String, message: String },

    // Premature termination
    #[error("Stream ended prematurely: {message}")]
    PrematureEnd { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse failure class used for reporting and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Input,
    Transport,
    Server,
    LocalIo,
    PrematureTermination,
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureCategory::Input => "input validation",
            FailureCategory::Transport => "transport",
            FailureCategory::Server => "server",
            FailureCategory::LocalIo => "local I/O",
            FailureCategory::PrematureTermination => "premature termination",
        };
        f.write_str(name)
    }
}

impl FailureCategory {
    /// Process exit code for this category. Success is 0.
    pub fn exit_code(self) -> i32 {
        match self {
            FailureCategory::Input => 2,
            FailureCategory::Transport => 3,
            FailureCategory::Server => 4,
            FailureCategory::LocalIo => 5,
            FailureCategory::PrematureTermination => 6,
        }
    }
}

impl A2f2dError {
    pub fn category(&self) -> FailureCategory {
        match self {
            A2f2dError::InputNotFound { .. }
            | A2f2dError::MissingInput { .. }
            | A2f2dError::InputRead { .. }
            | A2f2dError::PoseTableParse { .. }
            | A2f2dError::AudioFormatMismatch { .. }
            | A2f2dError::ConfigInvalidValue { .. }
            | A2f2dError::ConfigParse { .. }
            | A2f2dError::Config(_)
            | A2f2dError::MissingCredential { .. }
            | A2f2dError::InvalidCredential { .. }
            | A2f2dError::RelayBind { .. } => FailureCategory::Input,
            A2f2dError::Connect { .. } | A2f2dError::Transport { .. } => {
                FailureCategory::Transport
            }
            A2f2dError::Rpc { .. } => FailureCategory::Server,
            A2f2dError::AudioRead { .. } | A2f2dError::SinkWrite { .. } | A2f2dError::Io(_) => {
                FailureCategory::LocalIo
            }
            A2f2dError::PrematureEnd { .. } => FailureCategory::PrematureTermination,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    /// Split an inbound stream status into transport vs. server failures.
    ///
    /// tonic reports broken connections as `Unavailable`, or with the
    /// underlying h2/hyper error attached as the source.
    pub fn from_status(status: tonic::Status) -> Self {
        use std::error::Error as _;

        if status.code() == tonic::Code::Unavailable || status.source().is_some() {
            A2f2dError::Transport {
                message: status.message().to_string(),
            }
        } else {
            A2f2dError::Rpc {
                code: status.code(),
                message: status.message().to_string(),
            }
        }
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, A2f2dError>;
