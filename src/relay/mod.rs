//! Browser relay: mirrors the video stream to a local HTTP client.
//!
//! [`channel`] splits the relay into a [`RelaySink`] that the session writes
//! to and a [`RelayFeed`] the HTTP server hands to the first `/video`
//! request. Chunks written before a browser connects are buffered until it
//! does.

pub mod server;

pub use server::RelayServer;

use crate::error::{A2f2dError, Result};
use crate::session::VideoSink;
use bytes::Bytes;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Create a connected sink/feed pair.
pub fn channel() -> (RelaySink, RelayFeed) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        RelaySink { tx: Some(tx) },
        RelayFeed {
            rx: Arc::new(Mutex::new(Some(rx))),
        },
    )
}

/// Session side of the relay.
pub struct RelaySink {
    tx: Option<mpsc::UnboundedSender<Bytes>>,
}

#[async_trait::async_trait]
impl VideoSink for RelaySink {
    async fn write_chunk(&mut self, chunk: &Bytes) -> Result<()> {
        let disconnected = || A2f2dError::SinkWrite {
            sink: "browser relay".to_string(),
            message: "browser disconnected".to_string(),
        };
        let tx = self.tx.as_ref().ok_or_else(disconnected)?;
        tx.send(chunk.clone()).map_err(|_| {
            // File and relay stay in step; a lost browser fails the session.
            tracing::warn!("Browser left /video while the session was still streaming");
            disconnected()
        })
    }

    async fn finish(&mut self) -> Result<()> {
        // Dropping the sender ends the HTTP body.
        self.tx = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "browser relay"
    }
}

/// Server side of the relay. Clones share the same single feed.
#[derive(Debug, Clone)]
pub struct RelayFeed {
    rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<Bytes>>>>,
}

impl RelayFeed {
    /// Take the video stream. Only the first caller gets it.
    pub fn claim(&self) -> Option<UnboundedReceiverStream<Bytes>> {
        self.rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(UnboundedReceiverStream::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn chunks_before_claim_are_buffered() {
        let (mut sink, feed) = channel();
        sink.write_chunk(&Bytes::from_static(b"early")).await.unwrap();
        sink.write_chunk(&Bytes::from_static(b"late")).await.unwrap();
        sink.finish().await.unwrap();

        let chunks: Vec<Bytes> = feed.claim().unwrap().collect().await;
        assert_eq!(chunks, vec![Bytes::from_static(b"early"), Bytes::from_static(b"late")]);
    }

    #[test]
    fn feed_is_claimed_once() {
        let (_sink, feed) = channel();
        let other = feed.clone();
        assert!(feed.claim().is_some());
        assert!(other.claim().is_none());
    }

    #[tokio::test]
    async fn dropped_consumer_fails_write() {
        let (mut sink, feed) = channel();
        drop(feed.claim());
        let err = sink.write_chunk(&Bytes::from_static(b"x")).await.unwrap_err();
        assert!(matches!(err, A2f2dError::SinkWrite { .. }));
    }

    #[tokio::test]
    async fn write_after_finish_fails() {
        let (mut sink, _feed) = channel();
        sink.finish().await.unwrap();
        assert!(sink.write_chunk(&Bytes::from_static(b"x")).await.is_err());
    }
}
