use crate::error::{A2f2dError, Result};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::AsyncWriteExt;

/// Destination for video chunks, written in arrival order.
#[async_trait::async_trait]
pub trait VideoSink: Send {
    /// Append one chunk.
    async fn write_chunk(&mut self, chunk: &Bytes) -> Result<()>;

    /// Flush and release. Called once, after the last chunk.
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    /// Name for logging.
    fn name(&self) -> &str;
}

/// The primary output file.
pub struct FileSink {
    file: Option<tokio::fs::File>,
    path: PathBuf,
    label: String,
}

impl FileSink {
    /// Create (or truncate) `path`.
    pub async fn create(path: &Path) -> Result<Self> {
        let file = tokio::fs::File::create(path)
            .await
            .map_err(|e| A2f2dError::SinkWrite {
                sink: path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            file: Some(file),
            path: path.to_path_buf(),
            label: path.display().to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, e: std::io::Error) -> A2f2dError {
        A2f2dError::SinkWrite {
            sink: self.label.clone(),
            message: e.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl VideoSink for FileSink {
    async fn write_chunk(&mut self, chunk: &Bytes) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(A2f2dError::SinkWrite {
                sink: self.label.clone(),
                message: "write after finish".to_string(),
            });
        };
        let result = file.write_all(chunk).await;
        result.map_err(|e| self.write_error(e))
    }

    async fn finish(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await.map_err(|e| self.write_error(e))?;
            file.sync_all().await.map_err(|e| self.write_error(e))?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Collects video in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CollectorSink {
    data: Arc<Mutex<Vec<u8>>>,
    finished: Arc<Mutex<bool>>,
    fail_after: Option<usize>,
    writes: usize,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `writes` chunks, then fail every write.
    pub fn failing_after(writes: usize) -> Self {
        Self {
            fail_after: Some(writes),
            ..Self::default()
        }
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_finished(&self) -> bool {
        *self.finished.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl VideoSink for CollectorSink {
    async fn write_chunk(&mut self, chunk: &Bytes) -> Result<()> {
        if self.fail_after.is_some_and(|limit| self.writes >= limit) {
            return Err(A2f2dError::SinkWrite {
                sink: "collector".to_string(),
                message: "collector refused write".to_string(),
            });
        }
        self.writes += 1;
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(chunk);
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        *self.finished.lock().unwrap_or_else(PoisonError::into_inner) = true;
        Ok(())
    }

    fn name(&self) -> &str {
        "collector"
    }
}
