use crate::defaults;
use crate::error::{A2f2dError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub inputs: InputConfig,
    pub animation: AnimationConfig,
    pub streaming: StreamingConfig,
    pub relay: RelayConfig,
}

/// gRPC endpoint and transport security
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    pub target: String,
    pub security: SecurityMode,
    pub root_cert: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
}

/// Local input and output files
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    pub audio: Option<PathBuf>,
    pub audio_format: AudioFormat,
    pub portrait: Option<PathBuf>,
    pub head_rotation: Option<PathBuf>,
    pub head_translation: Option<PathBuf>,
    pub output: PathBuf,
}

/// Parameters sent in the one-time animate config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    pub model: ModelSelection,
    pub crop_mode: CropMode,
    pub head_pose: HeadPose,
    pub enable_lookaway: bool,
    pub lookaway_max_offset: u32,
    pub lookaway_interval_min: u32,
    pub lookaway_interval_range: u32,
    pub blink_frequency: u32,
    pub blink_duration: u32,
    pub mouth_expression_multiplier: f32,
    pub head_pose_multiplier: f32,
}

/// Upload chunking and flow control
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamingConfig {
    pub chunk_size: usize,
    pub outbound_buffer: usize,
}

/// Optional browser relay
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    pub enabled: bool,
    pub port: u16,
}

/// Transport security mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SecurityMode {
    /// Plaintext HTTP/2
    #[default]
    Disabled,
    /// Server certificate validated against a root certificate
    Tls,
    /// TLS plus a client certificate and key
    Mtls,
}

/// Declared container format of the audio input
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// Self-describing WAV file (`.wav`)
    #[default]
    Wav,
    /// Headerless 48kHz mono 16-bit samples (`.raw`)
    Pcm,
}

/// Where head motion comes from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum HeadPose {
    /// Keep the pose of the portrait image
    #[default]
    RetainFromPortrait,
    /// Drive the head from rotation/translation tables
    UserDefined,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelSelection {
    Performance,
    #[default]
    Quality,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CropMode {
    Facebox,
    #[default]
    RegistrationBlending,
    InsetBlending,
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SecurityMode::Disabled => "disabled",
            SecurityMode::Tls => "tls",
            SecurityMode::Mtls => "mtls",
        })
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Pcm => "pcm",
        })
    }
}

impl AudioFormat {
    /// File extension an input of this format must carry.
    pub fn expected_extension(self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Pcm => "raw",
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            target: defaults::DEFAULT_TARGET.to_string(),
            security: SecurityMode::Disabled,
            root_cert: None,
            client_cert: None,
            client_key: None,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            audio: None,
            audio_format: AudioFormat::Wav,
            portrait: None,
            head_rotation: None,
            head_translation: None,
            output: PathBuf::from(defaults::DEFAULT_OUTPUT),
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            model: ModelSelection::Quality,
            crop_mode: CropMode::RegistrationBlending,
            head_pose: HeadPose::RetainFromPortrait,
            enable_lookaway: defaults::ENABLE_LOOKAWAY,
            lookaway_max_offset: defaults::LOOKAWAY_MAX_OFFSET,
            lookaway_interval_min: defaults::LOOKAWAY_INTERVAL_MIN,
            lookaway_interval_range: defaults::LOOKAWAY_INTERVAL_RANGE,
            blink_frequency: defaults::BLINK_FREQUENCY,
            blink_duration: defaults::BLINK_DURATION,
            mouth_expression_multiplier: defaults::MOUTH_EXPRESSION_MULTIPLIER,
            head_pose_multiplier: defaults::HEAD_POSE_MULTIPLIER,
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: defaults::CHUNK_SIZE,
            outbound_buffer: defaults::OUTBOUND_BUFFER,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: defaults::RELAY_PORT,
        }
    }
}

fn check_range<T>(key: &str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + fmt::Display + Copy,
{
    // NaN fails the containment check too.
    if !(min..=max).contains(&value) {
        return Err(A2f2dError::ConfigInvalidValue {
            key: key.to_string(),
            message: format!("{} is outside [{}, {}]", value, min, max),
        });
    }
    Ok(())
}

impl AnimationConfig {
    /// Check every parameter against the range the service accepts.
    pub fn validate(&self) -> Result<()> {
        check_range("lookaway_max_offset", self.lookaway_max_offset, 5, 25)?;
        check_range("lookaway_interval_min", self.lookaway_interval_min, 1, 600)?;
        check_range(
            "lookaway_interval_range",
            self.lookaway_interval_range,
            1,
            600,
        )?;
        check_range("blink_frequency", self.blink_frequency, 0, 120)?;
        check_range("blink_duration", self.blink_duration, 2, 150)?;
        check_range(
            "mouth_expression_multiplier",
            self.mouth_expression_multiplier,
            1.0,
            2.0,
        )?;
        check_range("head_pose_multiplier", self.head_pose_multiplier, 0.0, 1.0)?;
        Ok(())
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(A2f2dError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(A2f2dError::Io(e)) => Err(A2f2dError::ConfigParse {
                message: format!("{}: {}", path.display(), e),
            }),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - A2F2D_TARGET → connection.target
    /// - A2F2D_OUTPUT → inputs.output
    /// - A2F2D_BROWSER_PORT → relay.port
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(target) = std::env::var("A2F2D_TARGET")
            && !target.is_empty()
        {
            self.connection.target = target;
        }

        if let Ok(output) = std::env::var("A2F2D_OUTPUT")
            && !output.is_empty()
        {
            self.inputs.output = PathBuf::from(output);
        }

        if let Ok(port) = std::env::var("A2F2D_BROWSER_PORT")
            && !port.is_empty()
        {
            match port.parse::<u16>() {
                Ok(port) => self.relay.port = port,
                Err(e) => tracing::warn!(value = %port, "Ignoring A2F2D_BROWSER_PORT: {}", e),
            }
        }

        self
    }

    /// Validate values that don't depend on the filesystem.
    pub fn validate(&self) -> Result<()> {
        if self.connection.target.trim().is_empty() {
            return Err(A2f2dError::ConfigInvalidValue {
                key: "target".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        check_range(
            "chunk_size",
            self.streaming.chunk_size,
            1,
            defaults::MAX_CHUNK_SIZE,
        )?;
        if self.streaming.outbound_buffer == 0 {
            return Err(A2f2dError::ConfigInvalidValue {
                key: "outbound_buffer".to_string(),
                message: "must be positive".to_string(),
            });
        }
        self.animation.validate()
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/a2f2d/config.toml on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("a2f2d").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_a2f2d_env() {
        remove_env("A2F2D_TARGET");
        remove_env("A2F2D_OUTPUT");
        remove_env("A2F2D_BROWSER_PORT");
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.connection.target, "127.0.0.1:8001");
        assert_eq!(config.connection.security, SecurityMode::Disabled);
        assert_eq!(config.inputs.audio_format, AudioFormat::Wav);
        assert_eq!(config.inputs.output, PathBuf::from("output.mp4"));
        assert_eq!(config.animation.model, ModelSelection::Quality);
        assert_eq!(config.animation.crop_mode, CropMode::RegistrationBlending);
        assert_eq!(config.animation.head_pose, HeadPose::RetainFromPortrait);
        assert!(config.animation.enable_lookaway);
        assert_eq!(config.animation.lookaway_max_offset, 20);
        assert_eq!(config.animation.lookaway_interval_min, 240);
        assert_eq!(config.animation.lookaway_interval_range, 90);
        assert_eq!(config.animation.blink_frequency, 15);
        assert_eq!(config.animation.blink_duration, 6);
        assert_eq!(config.animation.mouth_expression_multiplier, 1.4);
        assert_eq!(config.animation.head_pose_multiplier, 1.0);
        assert_eq!(config.streaming.chunk_size, 1024 * 1024);
        assert!(!config.relay.enabled);
        assert_eq!(config.relay.port, 3000);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [connection]
            target = "grpc.example.com:443"
            security = "mtls"
            root_cert = "/certs/ca.pem"

            [inputs]
            audio_format = "pcm"

            [animation]
            head_pose = "user-defined"
            crop_mode = "inset-blending"
            blink_frequency = 30

            [relay]
            enabled = true
            port = 8080
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.connection.target, "grpc.example.com:443");
        assert_eq!(config.connection.security, SecurityMode::Mtls);
        assert_eq!(
            config.connection.root_cert,
            Some(PathBuf::from("/certs/ca.pem"))
        );
        assert_eq!(config.inputs.audio_format, AudioFormat::Pcm);
        assert_eq!(config.animation.head_pose, HeadPose::UserDefined);
        assert_eq!(config.animation.crop_mode, CropMode::InsetBlending);
        assert_eq!(config.animation.blink_frequency, 30);
        // Unspecified fields keep their defaults
        assert_eq!(config.animation.blink_duration, 6);
        assert!(config.relay.enabled);
        assert_eq!(config.relay.port, 8080);
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[connection\ntarget = ").unwrap();

        let result = Config::load(temp_file.path());
        assert!(matches!(result, Err(A2f2dError::Config(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/a2f2d/config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_invalid_toml_is_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"relay = 3").unwrap();

        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_a2f2d_env();

        set_env("A2F2D_TARGET", "10.0.0.5:9000");
        set_env("A2F2D_OUTPUT", "/tmp/out.mp4");
        set_env("A2F2D_BROWSER_PORT", "4000");

        let config = Config::default().with_env_overrides();
        clear_a2f2d_env();

        assert_eq!(config.connection.target, "10.0.0.5:9000");
        assert_eq!(config.inputs.output, PathBuf::from("/tmp/out.mp4"));
        assert_eq!(config.relay.port, 4000);
    }

    #[test]
    fn test_env_override_invalid_port_is_ignored() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_a2f2d_env();

        set_env("A2F2D_BROWSER_PORT", "not-a-port");
        let config = Config::default().with_env_overrides();
        clear_a2f2d_env();

        assert_eq!(config.relay.port, 3000);
    }

    #[test]
    fn test_env_override_empty_values_ignored() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_a2f2d_env();

        set_env("A2F2D_TARGET", "");
        let config = Config::default().with_env_overrides();
        clear_a2f2d_env();

        assert_eq!(config.connection.target, "127.0.0.1:8001");
    }

    #[test]
    fn test_validate_rejects_out_of_range_animation_values() {
        let mut config = Config::default();
        config.animation.lookaway_max_offset = 30;
        match config.validate() {
            Err(A2f2dError::ConfigInvalidValue { key, .. }) => {
                assert_eq!(key, "lookaway_max_offset")
            }
            other => panic!("Expected ConfigInvalidValue, got {:?}", other),
        }

        let mut config = Config::default();
        config.animation.mouth_expression_multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.animation.head_pose_multiplier = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_range_bounds() {
        let mut config = Config::default();
        config.animation.lookaway_max_offset = 5;
        config.animation.blink_frequency = 0;
        config.animation.blink_duration = 150;
        config.animation.head_pose_multiplier = 0.0;
        config.animation.mouth_expression_multiplier = 2.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let mut config = Config::default();
        config.streaming.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_chunk_size_above() {
        let mut config = Config::default();
        config.streaming.chunk_size = defaults::MAX_CHUNK_SIZE;
        assert!(config.validate().is_ok());

        config.streaming.chunk_size = usize::MAX;
        match config.validate() {
            Err(A2f2dError::ConfigInvalidValue { key, .. }) => assert_eq!(key, "chunk_size"),
            other => panic!("Expected ConfigInvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_nan_multipliers() {
        let config: Config = toml::from_str(
            "[animation]\nmouth_expression_multiplier = nan\n",
        )
        .unwrap();
        assert!(config.animation.mouth_expression_multiplier.is_nan());
        match config.validate() {
            Err(A2f2dError::ConfigInvalidValue { key, .. }) => {
                assert_eq!(key, "mouth_expression_multiplier")
            }
            other => panic!("Expected ConfigInvalidValue, got {:?}", other),
        }

        let config: Config = toml::from_str("[animation]\nhead_pose_multiplier = nan\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expected_extension() {
        assert_eq!(AudioFormat::Wav.expected_extension(), "wav");
        assert_eq!(AudioFormat::Pcm.expected_extension(), "raw");
    }

    #[test]
    fn test_default_path_ends_with_config_toml() {
        if let Some(path) = Config::default_path() {
            assert!(path.ends_with("a2f2d/config.toml"));
        }
    }
}
