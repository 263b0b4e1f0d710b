//! Default configuration constants for a2f2d.
//!
//! Shared by the config layer, the CLI and the session so every default is
//! defined once.

/// Default gRPC target (host:port).
pub const DEFAULT_TARGET: &str = "127.0.0.1:8001";

/// Default output video path.
pub const DEFAULT_OUTPUT: &str = "output.mp4";

/// Default port of the local browser relay.
pub const RELAY_PORT: u16 = 3000;

/// Size of one outbound audio chunk in bytes (1 MiB).
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Largest accepted chunk size. Leaves room for message framing under the
/// 4 MiB gRPC message limit servers apply by default.
pub const MAX_CHUNK_SIZE: usize = 4 * 1024 * 1024 - 64 * 1024;

/// Outbound messages queued ahead of the transport.
///
/// Small on purpose: the upload pump stalls as soon as the transport stops
/// accepting writes.
pub const OUTBOUND_BUFFER: usize = 4;

/// Raw PCM input profile: sample rate in Hz.
pub const PCM_SAMPLE_RATE: u32 = 48000;

/// Raw PCM input profile: channel count.
pub const PCM_CHANNELS: u16 = 1;

/// Raw PCM input profile: bits per sample.
pub const PCM_BITS_PER_SAMPLE: u16 = 16;

// Animation parameters. Ranges are enforced by `AnimationConfig::validate`.

pub const ENABLE_LOOKAWAY: bool = true;
pub const LOOKAWAY_MAX_OFFSET: u32 = 20;
pub const LOOKAWAY_INTERVAL_MIN: u32 = 240;
pub const LOOKAWAY_INTERVAL_RANGE: u32 = 90;
pub const BLINK_FREQUENCY: u32 = 15;
pub const BLINK_DURATION: u32 = 6;
pub const MOUTH_EXPRESSION_MULTIPLIER: f32 = 1.4;
pub const HEAD_POSE_MULTIPLIER: f32 = 1.0;

/// The raw PCM profile as a hound spec.
pub fn pcm_spec() -> hound::WavSpec {
    hound::WavSpec {
        channels: PCM_CHANNELS,
        sample_rate: PCM_SAMPLE_RATE,
        bits_per_sample: PCM_BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    }
}
