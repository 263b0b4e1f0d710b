//! Reads the audio input in fixed-size chunks for the outbound stream.

use crate::config::AudioFormat;
use crate::defaults::pcm_spec;
use crate::error::{A2f2dError, Result};
use crate::input::AudioInput;
use crate::input::audio::{pcm_data_len, wav_header};
use crate::proto::{AnimateRequest, animate_request};
use bytes::Bytes;
use std::io::Cursor;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Lazily reads audio from disk, one chunk per outbound message.
///
/// WAV files are sent byte for byte. Raw PCM is framed as WAV on the fly:
/// a 44-byte header followed by the sample data, never held in memory as a
/// whole.
pub struct AudioUploadPump {
    reader: Box<dyn AsyncRead + Send + Unpin>,
    source: String,
    chunk_size: usize,
    chunks_sent: u64,
    bytes_sent: u64,
    exhausted: bool,
}

impl AudioUploadPump {
    /// Open the validated audio input.
    pub async fn open(input: &AudioInput, chunk_size: usize) -> Result<Self> {
        let read_error = |e: std::io::Error| A2f2dError::AudioRead {
            path: input.path.display().to_string(),
            message: e.to_string(),
        };
        let file = tokio::fs::File::open(&input.path).await.map_err(read_error)?;

        let reader: Box<dyn AsyncRead + Send + Unpin> = match input.format {
            AudioFormat::Wav => Box::new(file),
            AudioFormat::Pcm => {
                let data_len = pcm_data_len(input.len)?;
                let header = wav_header(&pcm_spec(), data_len);
                Box::new(Cursor::new(header).chain(file.take(u64::from(data_len))))
            }
        };

        Ok(Self::from_reader(
            reader,
            input.path.display().to_string(),
            chunk_size,
        ))
    }

    /// Pump over any reader. `source` names it in errors.
    pub fn from_reader(
        reader: Box<dyn AsyncRead + Send + Unpin>,
        source: impl Into<String>,
        chunk_size: usize,
    ) -> Self {
        Self {
            reader,
            source: source.into(),
            chunk_size: chunk_size.max(1),
            chunks_sent: 0,
            bytes_sent: 0,
            exhausted: false,
        }
    }

    /// Next chunk, or `None` once the input is exhausted.
    ///
    /// Every chunk but the last is exactly `chunk_size` bytes.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self
                .reader
                .read(&mut buf[filled..])
                .await
                .map_err(|e| A2f2dError::AudioRead {
                    path: self.source.clone(),
                    message: e.to_string(),
                })?;
            if n == 0 {
                self.exhausted = true;
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        self.chunks_sent += 1;
        self.bytes_sent += filled as u64;
        Ok(Some(Bytes::from(buf)))
    }

    /// Next chunk wrapped as an outbound audio message.
    pub async fn next_request(&mut self) -> Result<Option<AnimateRequest>> {
        Ok(self.next_chunk().await?.map(|chunk| AnimateRequest {
            stream_input: Some(animate_request::StreamInput::AudioFileData(chunk)),
        }))
    }

    pub fn chunks_sent(&self) -> u64 {
        self.chunks_sent
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }
}
