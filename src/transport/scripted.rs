use super::{AnimateTransport, InboundStream, OutboundStream, UploadEnd};
use crate::error::{A2f2dError, Result};
use crate::proto::{AnimateConfig, AnimateRequest, AnimateResponse, animate_request, animate_response};
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// When the scripted server emits its responses relative to the upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    /// Read the whole upload, then reply.
    #[default]
    AfterUpload,
    /// Reply while the upload is still being read.
    Interleaved,
    /// Stop reading immediately, reply, then close.
    HangUp,
    /// Hold both halves open without reading or replying.
    Stall,
}

/// Shared view of what a [`ScriptedTransport`] received.
#[derive(Debug, Clone, Default)]
pub struct RequestLog {
    requests: Arc<Mutex<Vec<AnimateRequest>>>,
    upload_end: Arc<Mutex<Option<UploadEnd>>>,
    opens: Arc<AtomicUsize>,
}

impl RequestLog {
    fn push(&self, request: AnimateRequest) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }

    /// Every request received, in arrival order.
    pub fn requests(&self) -> Vec<AnimateRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Audio payloads concatenated in arrival order.
    pub fn audio_bytes(&self) -> Vec<u8> {
        let mut audio = Vec::new();
        for request in self.requests() {
            if let Some(animate_request::StreamInput::AudioFileData(chunk)) = request.stream_input {
                audio.extend_from_slice(&chunk);
            }
        }
        audio
    }

    /// How the upload half ended, once the transport has read to its end.
    pub fn upload_end(&self) -> Option<UploadEnd> {
        *self.upload_end.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// How many times `open` was called.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

/// In-process stand-in for the animation service.
///
/// Records every request it receives and replays a fixed list of responses.
/// An `Err` entry ends the stream with that status, like a server failing
/// the call.
///
/// # Example
///
/// ```
/// use a2f2d::transport::{Pacing, ScriptedTransport};
///
/// let transport = ScriptedTransport::new()
///     .with_config_echo()
///     .with_video(vec![0u8; 16])
///     .with_pacing(Pacing::AfterUpload);
/// let log = transport.log();
/// assert_eq!(log.opens(), 0);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Vec<std::result::Result<AnimateResponse, tonic::Status>>,
    pacing: Pacing,
    open_error: Option<String>,
    log: RequestLog,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, response: AnimateResponse) -> Self {
        self.responses.push(Ok(response));
        self
    }

    pub fn with_config_echo(self) -> Self {
        self.with_response(AnimateResponse {
            stream_output: Some(animate_response::StreamOutput::Config(
                AnimateConfig::default(),
            )),
        })
    }

    pub fn with_video(self, chunk: impl Into<Bytes>) -> Self {
        self.with_response(AnimateResponse {
            stream_output: Some(animate_response::StreamOutput::VideoFileData(chunk.into())),
        })
    }

    /// A response with no payload.
    pub fn with_keepalive(self) -> Self {
        self.with_response(AnimateResponse::default())
    }

    pub fn with_status(mut self, status: tonic::Status) -> Self {
        self.responses.push(Err(status));
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Make `open` fail, as if the connection could not be used.
    pub fn with_open_error(mut self, message: impl Into<String>) -> Self {
        self.open_error = Some(message.into());
        self
    }

    pub fn log(&self) -> RequestLog {
        self.log.clone()
    }
}

#[async_trait::async_trait]
impl AnimateTransport for ScriptedTransport {
    async fn open(&mut self, outbound: OutboundStream) -> Result<InboundStream> {
        self.log.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.open_error {
            return Err(A2f2dError::Connect {
                target: "scripted".to_string(),
                message: message.clone(),
            });
        }

        let (tx, rx) = mpsc::channel(self.responses.len().max(1));
        let responses = std::mem::take(&mut self.responses);
        let log = self.log.clone();
        let pacing = self.pacing;

        tokio::spawn(async move {
            match pacing {
                Pacing::AfterUpload => {
                    drain(outbound, log).await;
                    reply(&tx, responses).await;
                }
                Pacing::Interleaved => {
                    let reader = tokio::spawn(drain(outbound, log));
                    reply(&tx, responses).await;
                    if reader.await.is_err() {
                        tracing::debug!("Scripted upload reader panicked");
                    }
                }
                Pacing::HangUp => {
                    drop(outbound);
                    reply(&tx, responses).await;
                }
                Pacing::Stall => {
                    let _upload = outbound;
                    let _replies = tx;
                    std::future::pending::<()>().await;
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

async fn drain(mut outbound: OutboundStream, log: RequestLog) {
    while let Some(request) = outbound.recv().await {
        log.push(request);
    }
    *log.upload_end.lock().unwrap_or_else(PoisonError::into_inner) = outbound.end();
}

async fn reply(
    tx: &mpsc::Sender<std::result::Result<AnimateResponse, tonic::Status>>,
    responses: Vec<std::result::Result<AnimateResponse, tonic::Status>>,
) {
    for response in responses {
        let last = response.is_err();
        if tx.send(response).await.is_err() || last {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{UploadMessage, outbound};
    use futures_util::StreamExt;

    fn audio(data: &'static [u8]) -> AnimateRequest {
        AnimateRequest {
            stream_input: Some(animate_request::StreamInput::AudioFileData(
                Bytes::from_static(data),
            )),
        }
    }

    #[tokio::test]
    async fn replays_responses_after_upload() {
        let mut transport = ScriptedTransport::new()
            .with_config_echo()
            .with_video(vec![1u8, 2, 3]);
        let log = transport.log();

        let (tx, rx) = outbound::channel(4);
        tx.send(audio(b"ab").into()).await.unwrap();
        tx.send(audio(b"cd").into()).await.unwrap();
        tx.send(UploadMessage::Finish).await.unwrap();

        let inbound = transport.open(rx).await.unwrap();
        let responses: Vec<_> = inbound.collect().await;

        assert_eq!(responses.len(), 2);
        assert_eq!(log.opens(), 1);
        assert_eq!(log.audio_bytes(), b"abcd");
        assert_eq!(log.upload_end(), Some(UploadEnd::Finished));
    }

    #[tokio::test]
    async fn dropped_upload_is_logged_as_aborted() {
        let mut transport = ScriptedTransport::new().with_video(vec![1u8]);
        let log = transport.log();

        let (tx, rx) = outbound::channel(4);
        tx.send(audio(b"ab").into()).await.unwrap();
        drop(tx);

        let inbound = transport.open(rx).await.unwrap();
        let responses: Vec<_> = inbound.collect().await;

        assert_eq!(responses.len(), 1);
        assert_eq!(log.audio_bytes(), b"ab");
        assert_eq!(log.upload_end(), Some(UploadEnd::Aborted));
    }

    #[tokio::test]
    async fn status_ends_the_stream() {
        let mut transport = ScriptedTransport::new()
            .with_pacing(Pacing::HangUp)
            .with_status(tonic::Status::internal("boom"))
            .with_video(vec![9u8]);

        let (_tx, rx) = outbound::channel(1);
        let inbound = transport.open(rx).await.unwrap();
        let responses: Vec<_> = inbound.collect().await;

        assert_eq!(responses.len(), 1);
        assert_eq!(
            responses[0].as_ref().unwrap_err().code(),
            tonic::Code::Internal
        );
    }

    #[tokio::test]
    async fn open_error_is_reported() {
        let mut transport = ScriptedTransport::new().with_open_error("refused");
        let (_tx, rx) = outbound::channel(1);

        let result = transport.open(rx).await;
        assert!(matches!(result, Err(A2f2dError::Connect { .. })));
        assert_eq!(transport.log().opens(), 1);
    }
}
