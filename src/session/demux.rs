//! Routes inbound responses to the video sinks.

use super::sink::VideoSink;
use crate::error::Result;
use crate::proto::{AnimateResponse, animate_response};

/// What one inbound message turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// Video bytes, fanned out to every sink.
    Video { bytes: usize },
    /// First config echo from the server.
    ConfigEcho,
    /// No payload, or a repeated config echo.
    KeepAlive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxStats {
    pub video_chunks: u64,
    pub video_bytes: u64,
    pub keepalives: u64,
}

/// Fans video chunks out to a primary sink plus optional extra sinks.
///
/// Every sink sees the same chunks in the same order. A write failure on
/// any sink fails the dispatch.
pub struct ResponseDemultiplexer {
    sinks: Vec<Box<dyn VideoSink>>,
    echo_seen: bool,
    stats: DemuxStats,
    closed: bool,
}

impl ResponseDemultiplexer {
    pub fn new(primary: Box<dyn VideoSink>) -> Self {
        Self {
            sinks: vec![primary],
            echo_seen: false,
            stats: DemuxStats::default(),
            closed: false,
        }
    }

    /// Add a secondary sink.
    pub fn with_sink(mut self, sink: Box<dyn VideoSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub async fn dispatch(&mut self, response: AnimateResponse) -> Result<Inbound> {
        match response.stream_output {
            Some(animate_response::StreamOutput::VideoFileData(chunk)) => {
                for sink in &mut self.sinks {
                    sink.write_chunk(&chunk).await?;
                }
                self.stats.video_chunks += 1;
                self.stats.video_bytes += chunk.len() as u64;
                Ok(Inbound::Video { bytes: chunk.len() })
            }
            Some(animate_response::StreamOutput::Config(_)) if !self.echo_seen => {
                self.echo_seen = true;
                tracing::info!("Server acknowledged the animate config");
                Ok(Inbound::ConfigEcho)
            }
            Some(animate_response::StreamOutput::Config(_)) | None => {
                self.stats.keepalives += 1;
                tracing::trace!(count = self.stats.keepalives, "Keepalive");
                Ok(Inbound::KeepAlive)
            }
        }
    }

    /// Finish every sink. All sinks are attempted; the first error wins.
    ///
    /// Later calls, and calls after [`abort`](Self::abort), do nothing.
    pub async fn finalize(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.finish().await {
                tracing::error!(sink = sink.name(), error = %e, "Failed to finish video sink");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Best-effort release after a failure. Errors are only logged.
    pub async fn abort(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        for sink in &mut self.sinks {
            if let Err(e) = sink.finish().await {
                tracing::warn!(sink = sink.name(), error = %e, "Video sink cleanup failed");
            }
        }
    }

    pub fn stats(&self) -> DemuxStats {
        self.stats
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.sinks.iter().map(|s| s.name().to_string()).collect()
    }
}
