//! Session lifecycle.
//!
//! ```text
//! Idle -> ConfigSent -> Streaming -> UploadClosed -> Draining -> Closed(Success)
//!                  \______________/
//!                  (empty audio)
//! any non-terminal state -> Closed(Failure)
//! ```

use crate::proto::AnimateResponse;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// Config queued and the call opened.
    ConfigSent,
    /// At least one audio chunk handed to the transport.
    Streaming,
    /// Audio exhausted and the outbound half closed.
    UploadClosed,
    /// Waiting for the server to finish the inbound half.
    Draining,
    Closed(Completion),
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed(_))
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::*;

        match (self, next) {
            (Closed(_), _) => false,
            (_, Closed(Completion::Failure)) => true,
            (Idle, ConfigSent)
            | (ConfigSent, Streaming)
            | (ConfigSent, UploadClosed)
            | (Streaming, UploadClosed)
            | (UploadClosed, Draining)
            | (Draining, Closed(Completion::Success)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("idle"),
            SessionState::ConfigSent => f.write_str("config-sent"),
            SessionState::Streaming => f.write_str("streaming"),
            SessionState::UploadClosed => f.write_str("upload-closed"),
            SessionState::Draining => f.write_str("draining"),
            SessionState::Closed(Completion::Success) => f.write_str("closed (success)"),
            SessionState::Closed(Completion::Failure) => f.write_str("closed (failure)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    NotStarted,
    InProgress,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    AwaitingConfigEcho,
    Receiving,
    Complete,
    Failed,
}

/// One poll result of the inbound stream.
#[derive(Debug)]
pub enum StreamEvent {
    Message(AnimateResponse),
    /// The server finished its half cleanly.
    HalfClosed,
    Errored(tonic::Status),
}

impl From<Option<std::result::Result<AnimateResponse, tonic::Status>>> for StreamEvent {
    fn from(next: Option<std::result::Result<AnimateResponse, tonic::Status>>) -> Self {
        match next {
            Some(Ok(message)) => StreamEvent::Message(message),
            Some(Err(status)) => StreamEvent::Errored(status),
            None => StreamEvent::HalfClosed,
        }
    }
}

/// State of one session plus its transition history.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    pub upload: UploadState,
    pub download: DownloadState,
    history: Vec<SessionState>,
    started: Instant,
    elapsed: Option<Duration>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            upload: UploadState::NotStarted,
            download: DownloadState::AwaitingConfigEcho,
            history: vec![SessionState::Idle],
            started: Instant::now(),
            elapsed: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `next`. Illegal transitions are refused and logged.
    pub fn advance(&mut self, next: SessionState) -> bool {
        if !self.state.can_advance_to(next) {
            tracing::warn!(from = %self.state, to = %next, "Refusing session transition");
            return false;
        }
        tracing::debug!(from = %self.state, to = %next, "Session transition");
        self.state = next;
        self.history.push(next);
        if next.is_terminal() {
            self.elapsed = Some(self.started.elapsed());
        }
        true
    }

    /// Close as failed, marking whichever half was unfinished.
    pub fn fail(&mut self) {
        if matches!(self.upload, UploadState::NotStarted | UploadState::InProgress) {
            self.upload = UploadState::Failed;
        }
        if self.download != DownloadState::Complete {
            self.download = DownloadState::Failed;
        }
        self.advance(SessionState::Closed(Completion::Failure));
    }

    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    /// Time from creation to close, or until now while still open.
    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }
}
