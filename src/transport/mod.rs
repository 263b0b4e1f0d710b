//! Bidirectional stream transport for the `Animate` call.
//!
//! The session only needs "open a stream of typed requests and get a stream
//! of typed responses back". [`GrpcTransport`] does that over tonic for the
//! three security modes; [`ScriptedTransport`] replays canned responses
//! in-process.

pub mod grpc;
pub mod outbound;
pub mod scripted;
pub mod security;

pub use grpc::GrpcTransport;
pub use outbound::{OutboundStream, UploadEnd, UploadMessage, UploadSender};
pub use scripted::{Pacing, RequestLog, ScriptedTransport};
pub use security::ChannelSecurity;

use crate::error::Result;
use crate::proto::AnimateResponse;
use futures_util::Stream;
use std::pin::Pin;

/// Inbound half: responses until the server closes or fails the stream.
pub type InboundStream =
    Pin<Box<dyn Stream<Item = std::result::Result<AnimateResponse, tonic::Status>> + Send>>;

/// Opens one `Animate` conversation.
#[async_trait::async_trait]
pub trait AnimateTransport: Send {
    /// Start the call. Requests already queued on `outbound` go out first.
    /// The upload half closes gracefully only once `outbound` ends; an
    /// aborted upload must never look like a complete one to the server.
    async fn open(&mut self, outbound: OutboundStream) -> Result<InboundStream>;

    /// Name for logging.
    fn name(&self) -> &str;
}
