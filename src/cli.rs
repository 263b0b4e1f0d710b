//! Command-line interface for a2f2d
//!
//! Provides argument parsing using clap derive macros. Every flag is
//! optional here; anything not given falls back to the config file, then to
//! the built-in defaults.

use crate::config::{AudioFormat, Config, HeadPose, SecurityMode};
use clap::Parser;
use std::path::PathBuf;

/// Animate a portrait from speech audio with a remote Audio2Face-2D service
#[derive(Parser, Debug)]
#[command(name = "a2f2d", version, about)]
pub struct Cli {
    /// Service address (host:port)
    #[arg(long, value_name = "HOST:PORT")]
    pub target: Option<String>,

    /// Transport security
    #[arg(long, value_enum, ignore_case = true, value_name = "MODE")]
    pub ssl_mode: Option<SecurityMode>,

    /// Root certificate (PEM) used to validate the server
    #[arg(long, value_name = "PATH")]
    pub ssl_root_cert: Option<PathBuf>,

    /// Client certificate (PEM), mtls only
    #[arg(long, value_name = "PATH")]
    pub ssl_cert: Option<PathBuf>,

    /// Client private key (PEM), mtls only
    #[arg(long, value_name = "PATH")]
    pub ssl_key: Option<PathBuf>,

    /// Speech audio to animate
    #[arg(long, value_name = "PATH")]
    pub audio_input: Option<PathBuf>,

    /// Container format of --audio-input (pcm is 48kHz mono 16-bit, .raw)
    #[arg(long, value_enum, ignore_case = true, value_name = "FORMAT")]
    pub format: Option<AudioFormat>,

    /// Portrait image to animate
    #[arg(long, value_name = "PATH")]
    pub portrait_input: Option<PathBuf>,

    /// Where head motion comes from
    #[arg(long, value_enum, value_name = "MODE")]
    pub head_pose_mode: Option<HeadPose>,

    /// Rotation table (x,y,z,w per line), user-defined head pose only
    #[arg(long, value_name = "PATH")]
    pub head_rotation_animation_filepath: Option<PathBuf>,

    /// Translation table (x,y,z per line), user-defined head pose only
    #[arg(long, value_name = "PATH")]
    pub head_translation_animation_filepath: Option<PathBuf>,

    /// Output video file
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Also stream the video to a browser at http://localhost:<browser-port>
    #[arg(long)]
    pub browser: bool,

    /// Port of the browser relay
    #[arg(long, value_name = "PORT")]
    pub browser_port: Option<u16>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose output (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(target) = &self.target {
            config.connection.target = target.clone();
        }
        if let Some(mode) = self.ssl_mode {
            config.connection.security = mode;
        }
        if let Some(path) = &self.ssl_root_cert {
            config.connection.root_cert = Some(path.clone());
        }
        if let Some(path) = &self.ssl_cert {
            config.connection.client_cert = Some(path.clone());
        }
        if let Some(path) = &self.ssl_key {
            config.connection.client_key = Some(path.clone());
        }

        if let Some(path) = &self.audio_input {
            config.inputs.audio = Some(path.clone());
        }
        if let Some(format) = self.format {
            config.inputs.audio_format = format;
        }
        if let Some(path) = &self.portrait_input {
            config.inputs.portrait = Some(path.clone());
        }
        if let Some(path) = &self.head_rotation_animation_filepath {
            config.inputs.head_rotation = Some(path.clone());
        }
        if let Some(path) = &self.head_translation_animation_filepath {
            config.inputs.head_translation = Some(path.clone());
        }
        if let Some(path) = &self.output {
            config.inputs.output = path.clone();
        }

        if let Some(mode) = self.head_pose_mode {
            config.animation.head_pose = mode;
        }

        if self.browser {
            config.relay.enabled = true;
        }
        if let Some(port) = self.browser_port {
            config.relay.port = port;
        }

        config
    }

    /// Default log filter for the verbosity flags.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
