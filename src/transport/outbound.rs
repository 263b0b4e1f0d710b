//! Upload half of the `Animate` call.
//!
//! The upload only ends cleanly when the session says so with
//! [`UploadMessage::Finish`]. If every sender is dropped without it (a read
//! error, a sink failure, the session task going away) the upload counts as
//! aborted: the stream then stays pending instead of ending, so HTTP/2 never
//! sends END_STREAM and the call dies with its connection rather than
//! handing the server a truncated track that looks complete.

use crate::proto::AnimateRequest;
use futures_util::Stream;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::sync::mpsc;

/// What the session queues on the upload half.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadMessage {
    Request(AnimateRequest),
    /// The upload is complete; close the half gracefully.
    Finish,
}

impl From<AnimateRequest> for UploadMessage {
    fn from(request: AnimateRequest) -> Self {
        Self::Request(request)
    }
}

/// How the upload half ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadEnd {
    Finished,
    Aborted,
}

/// Sending side, held by the session.
pub type UploadSender = mpsc::Sender<UploadMessage>;

/// Bounded upload channel holding at most `buffer` queued messages.
pub fn channel(buffer: usize) -> (UploadSender, OutboundStream) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (tx, OutboundStream { rx, end: None })
}

/// Receiving side, handed to the transport.
#[derive(Debug)]
pub struct OutboundStream {
    rx: mpsc::Receiver<UploadMessage>,
    end: Option<UploadEnd>,
}

impl OutboundStream {
    /// Next request, or `None` once the upload ended either way.
    pub async fn recv(&mut self) -> Option<AnimateRequest> {
        std::future::poll_fn(|cx| self.poll_recv(cx)).await
    }

    /// `None` while the upload is still open.
    pub fn end(&self) -> Option<UploadEnd> {
        self.end
    }

    fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<AnimateRequest>> {
        if self.end.is_some() {
            return Poll::Ready(None);
        }
        match ready!(self.rx.poll_recv(cx)) {
            Some(UploadMessage::Request(request)) => Poll::Ready(Some(request)),
            Some(UploadMessage::Finish) => {
                self.end = Some(UploadEnd::Finished);
                self.rx.close();
                Poll::Ready(None)
            }
            None => {
                tracing::debug!("Upload aborted before it was finished");
                self.end = Some(UploadEnd::Aborted);
                Poll::Ready(None)
            }
        }
    }
}

/// Ends only after [`UploadMessage::Finish`]; an aborted upload stays
/// pending forever.
impl Stream for OutboundStream {
    type Item = AnimateRequest;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.poll_recv(cx) {
            Poll::Ready(None) if this.end == Some(UploadEnd::Aborted) => Poll::Pending,
            other => other,
        }
    }
}
