use super::demux::{Inbound, ResponseDemultiplexer};
use super::handshake;
use super::state::{Completion, DownloadState, Session, SessionState, StreamEvent, UploadState};
use super::upload::AudioUploadPump;
use crate::defaults;
use crate::error::{A2f2dError, Result};
use crate::proto::AnimateConfig;
use crate::transport::{AnimateTransport, UploadMessage, UploadSender, outbound};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;

/// Outcome of a successful session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub elapsed: Duration,
    pub audio_chunks: u64,
    pub audio_bytes: u64,
    pub video_chunks: u64,
    pub video_bytes: u64,
    pub keepalives: u64,
    pub transitions: Vec<SessionState>,
}

/// Runs one `Animate` session over a transport.
///
/// Upload and download proceed concurrently: the upload only advances when
/// the outbound queue has room, and inbound messages are handled as soon as
/// they arrive, so neither half can stall the other.
pub struct SessionController<T: AnimateTransport> {
    transport: T,
    outbound_buffer: usize,
}

impl<T: AnimateTransport> SessionController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            outbound_buffer: defaults::OUTBOUND_BUFFER,
        }
    }

    /// Outbound messages queued ahead of the transport. At least 1.
    pub fn with_outbound_buffer(mut self, messages: usize) -> Self {
        self.outbound_buffer = messages.max(1);
        self
    }

    /// Run to completion.
    ///
    /// On success every sink has been finished. On failure the upload half
    /// is aborted rather than closed, the sinks are released without further
    /// writes and the first error is returned.
    pub async fn run(
        mut self,
        config: AnimateConfig,
        mut pump: AudioUploadPump,
        mut demux: ResponseDemultiplexer,
    ) -> Result<SessionReport> {
        let mut session = Session::new();
        tracing::info!(transport = self.transport.name(), sinks = ?demux.sink_names(), "Starting session");

        match self.drive(&mut session, config, &mut pump, &mut demux).await {
            Ok(()) => {
                session.advance(SessionState::Closed(Completion::Success));
                let stats = demux.stats();
                tracing::info!(
                    elapsed_ms = session.elapsed().as_millis() as u64,
                    video_chunks = stats.video_chunks,
                    video_bytes = stats.video_bytes,
                    "Session complete"
                );
                Ok(SessionReport {
                    elapsed: session.elapsed(),
                    audio_chunks: pump.chunks_sent(),
                    audio_bytes: pump.bytes_sent(),
                    video_chunks: stats.video_chunks,
                    video_bytes: stats.video_bytes,
                    keepalives: stats.keepalives,
                    transitions: session.history().to_vec(),
                })
            }
            Err(e) => {
                session.fail();
                demux.abort().await;
                tracing::error!(
                    error = %e,
                    category = %e.category(),
                    audio_chunks = pump.chunks_sent(),
                    video_chunks = demux.stats().video_chunks,
                    "Session failed"
                );
                Err(e)
            }
        }
    }

    async fn drive(
        &mut self,
        session: &mut Session,
        config: AnimateConfig,
        pump: &mut AudioUploadPump,
        demux: &mut ResponseDemultiplexer,
    ) -> Result<()> {
        let (tx, rx) = outbound::channel(self.outbound_buffer);
        handshake::queue_config(&tx, config).await?;
        let mut inbound = self.transport.open(rx).await?;
        session.advance(SessionState::ConfigSent);
        session.upload = UploadState::InProgress;

        // `None` once the upload half is closed. Dropping the sender on an
        // early return aborts the upload.
        let mut outbound = Some(tx);

        loop {
            tokio::select! {
                biased;

                next = inbound.next() => match StreamEvent::from(next) {
                    StreamEvent::Message(response) => {
                        let kind = demux.dispatch(response).await?;
                        session.download = DownloadState::Receiving;
                        if let Inbound::Video { bytes } = kind {
                            tracing::debug!(bytes, "Video chunk");
                        }
                    }
                    StreamEvent::Errored(status) => {
                        return Err(A2f2dError::from_status(status));
                    }
                    StreamEvent::HalfClosed => {
                        if session.state() != SessionState::Draining {
                            return Err(A2f2dError::PrematureEnd {
                                message: format!(
                                    "server closed the stream after {} of the audio chunks, before the upload finished",
                                    pump.chunks_sent()
                                ),
                            });
                        }
                        demux.finalize().await?;
                        session.download = DownloadState::Complete;
                        return Ok(());
                    }
                },

                permit = reserve(&outbound), if outbound.is_some() => match permit {
                    Ok(permit) => match pump.next_request().await? {
                        Some(request) => {
                            permit.send(request.into());
                            if session.state() == SessionState::ConfigSent {
                                session.advance(SessionState::Streaming);
                            }
                        }
                        None => {
                            permit.send(UploadMessage::Finish);
                            outbound = None;
                            session.upload = UploadState::Complete;
                            session.advance(SessionState::UploadClosed);
                            session.advance(SessionState::Draining);
                            tracing::info!(
                                chunks = pump.chunks_sent(),
                                bytes = pump.bytes_sent(),
                                "Input audio sent"
                            );
                        }
                    },
                    Err(_) => {
                        // The transport dropped the upload half. The inbound
                        // stream reports why.
                        tracing::debug!("Transport stopped accepting audio");
                        outbound = None;
                    }
                },
            }
        }
    }
}

/// Wait for room in the outbound queue. Pending forever once it is closed.
///
/// The permit is owned so the loop can drop `outbound` while holding it.
async fn reserve(
    outbound: &Option<UploadSender>,
) -> std::result::Result<mpsc::OwnedPermit<UploadMessage>, mpsc::error::SendError<()>> {
    match outbound {
        Some(tx) => tx.clone().reserve_owned().await,
        None => std::future::pending().await,
    }
}
