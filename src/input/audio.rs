//! Audio input validation and the WAV framing used for raw PCM uploads.

use crate::config::AudioFormat;
use crate::error::{A2f2dError, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Size of the canonical RIFF/WAVE PCM header.
pub const WAV_HEADER_LEN: usize = 44;

/// A validated audio file, ready for the upload pump.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInput {
    pub path: PathBuf,
    pub format: AudioFormat,
    /// File size in bytes at validation time.
    pub len: u64,
}

impl AudioInput {
    /// Validate `path` against the declared `format`.
    ///
    /// Checks, in order: extension matches the format, file exists, and for
    /// WAV input that the header parses.
    pub fn open(path: &Path, format: AudioFormat) -> Result<Self> {
        check_extension(path, format)?;
        super::require_file(path)?;

        let len = std::fs::metadata(path)
            .map_err(|e| A2f2dError::InputRead {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
            .len();

        match format {
            AudioFormat::Wav => {
                let spec = probe_wav(path)?;
                tracing::debug!(
                    sample_rate = spec.sample_rate,
                    channels = spec.channels,
                    bits = spec.bits_per_sample,
                    "Audio input is WAV"
                );
            }
            AudioFormat::Pcm => {
                pcm_data_len(len)?;
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            format,
            len,
        })
    }
}

/// Reject inputs whose extension disagrees with the declared format.
pub fn check_extension(path: &Path, format: AudioFormat) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    if extension != format.expected_extension() {
        return Err(A2f2dError::AudioFormatMismatch {
            format: format.to_string(),
            extension,
        });
    }
    Ok(())
}

/// Parse only the WAV header of `path`.
pub fn probe_wav(path: &Path) -> Result<hound::WavSpec> {
    let file = File::open(path).map_err(|e| A2f2dError::InputRead {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let reader =
        hound::WavReader::new(BufReader::new(file)).map_err(|e| A2f2dError::InputRead {
            path: path.display().to_string(),
            message: format!("Failed to parse WAV file: {}", e),
        })?;
    Ok(reader.spec())
}

/// Number of sample bytes framed from a raw PCM file of `file_len` bytes.
///
/// A trailing partial sample frame is dropped.
pub fn pcm_data_len(file_len: u64) -> Result<u32> {
    let block_align = u64::from(block_align(&crate::defaults::pcm_spec()));
    let whole = file_len - file_len % block_align;
    let max = u64::from(u32::MAX) - (WAV_HEADER_LEN as u64 - 8);
    if whole > max {
        return Err(A2f2dError::ConfigInvalidValue {
            key: "audio_input".to_string(),
            message: format!("{} bytes of PCM exceed the WAV size limit", file_len),
        });
    }
    Ok(whole as u32)
}

fn block_align(spec: &hound::WavSpec) -> u16 {
    spec.channels * spec.bits_per_sample.div_ceil(8)
}

/// Build the 44-byte RIFF/WAVE header for `data_len` bytes of integer PCM.
pub fn wav_header(spec: &hound::WavSpec, data_len: u32) -> [u8; WAV_HEADER_LEN] {
    let block_align = block_align(spec);
    let byte_rate = spec.sample_rate * u32::from(block_align);

    let mut header = [0u8; WAV_HEADER_LEN];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(36 + data_len).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // WAVE_FORMAT_PCM
    header[22..24].copy_from_slice(&spec.channels.to_le_bytes());
    header[24..28].copy_from_slice(&spec.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&spec.bits_per_sample.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_len.to_le_bytes());
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::pcm_spec;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;

    fn make_wav_data(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    fn write_file(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(data).unwrap();
        path
    }

    #[test]
    fn header_parses_with_hound() {
        let samples: Vec<i16> = vec![0, 1000, -1000, 32767, -32768];
        let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();

        let mut data = wav_header(&pcm_spec(), pcm.len() as u32).to_vec();
        data.extend_from_slice(&pcm);

        let mut reader = hound::WavReader::new(Cursor::new(data)).unwrap();
        assert_eq!(reader.spec(), pcm_spec());
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn header_sizes_are_little_endian() {
        let header = wav_header(&pcm_spec(), 96000);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(header[4..8].try_into().unwrap()), 96036);
        assert_eq!(u32::from_le_bytes(header[24..28].try_into().unwrap()), 48000);
        // 48000 Hz * 1 channel * 2 bytes
        assert_eq!(u32::from_le_bytes(header[28..32].try_into().unwrap()), 96000);
        assert_eq!(u32::from_le_bytes(header[40..44].try_into().unwrap()), 96000);
    }

    #[test]
    fn pcm_data_len_drops_partial_frame() {
        assert_eq!(pcm_data_len(10).unwrap(), 10);
        assert_eq!(pcm_data_len(11).unwrap(), 10);
        assert_eq!(pcm_data_len(0).unwrap(), 0);
    }

    #[test]
    fn extension_must_match_format() {
        assert!(check_extension(Path::new("speech.wav"), AudioFormat::Wav).is_ok());
        assert!(check_extension(Path::new("SPEECH.WAV"), AudioFormat::Wav).is_ok());
        assert!(check_extension(Path::new("speech.raw"), AudioFormat::Pcm).is_ok());

        let err = check_extension(Path::new("speech.wav"), AudioFormat::Pcm).unwrap_err();
        assert!(matches!(
            err,
            A2f2dError::AudioFormatMismatch { ref extension, .. } if extension == "wav"
        ));
        assert!(check_extension(Path::new("speech.raw"), AudioFormat::Wav).is_err());
        assert!(check_extension(Path::new("speech"), AudioFormat::Wav).is_err());
    }

    #[test]
    fn open_missing_file_names_path() {
        let err = AudioInput::open(Path::new("/nonexistent/speech.wav"), AudioFormat::Wav)
            .unwrap_err();
        match err {
            A2f2dError::InputNotFound { path } => assert!(path.ends_with("speech.wav")),
            other => panic!("Expected InputNotFound, got {:?}", other),
        }
    }

    #[test]
    fn open_valid_wav() {
        let dir = TempDir::new().unwrap();
        let data = make_wav_data(16000, 1, &[1, 2, 3, 4]);
        let path = write_file(&dir, "speech.wav", &data);

        let input = AudioInput::open(&path, AudioFormat::Wav).unwrap();
        assert_eq!(input.len, data.len() as u64);
        assert_eq!(input.format, AudioFormat::Wav);
    }

    #[test]
    fn open_rejects_wav_extension_with_garbage_content() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "speech.wav", b"definitely not a wav file");

        let err = AudioInput::open(&path, AudioFormat::Wav).unwrap_err();
        assert!(err.to_string().contains("Failed to parse WAV file"));
    }

    #[test]
    fn open_accepts_raw_pcm() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "speech.raw", &[0u8; 480]);

        let input = AudioInput::open(&path, AudioFormat::Pcm).unwrap();
        assert_eq!(input.len, 480);
    }
}
