//! Input materialization.
//!
//! Everything here runs before the first network call: a failure means the
//! session never starts.

pub mod audio;
pub mod pose;

pub use audio::AudioInput;
pub use pose::HeadPoseAnimation;

use crate::config::{HeadPose, InputConfig};
use crate::error::{A2f2dError, Result};
use bytes::Bytes;
use std::path::Path;

/// Validated, in-memory inputs for one session.
#[derive(Debug, Clone)]
pub struct MaterializedInputs {
    pub portrait: Bytes,
    pub audio: AudioInput,
    /// Present only in user-defined head-pose mode.
    pub head_pose: Option<HeadPoseAnimation>,
}

/// Fail with `InputNotFound` unless `path` is an existing regular file.
pub fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(A2f2dError::InputNotFound {
            path: path.display().to_string(),
        })
    }
}

/// Load and validate every local input named by `inputs`.
pub fn materialize(inputs: &InputConfig, head_pose: HeadPose) -> Result<MaterializedInputs> {
    let audio_path = inputs
        .audio
        .as_deref()
        .ok_or_else(|| A2f2dError::MissingInput {
            what: "--audio-input".to_string(),
        })?;
    let portrait_path = inputs
        .portrait
        .as_deref()
        .ok_or_else(|| A2f2dError::MissingInput {
            what: "--portrait-input".to_string(),
        })?;

    let audio = AudioInput::open(audio_path, inputs.audio_format)?;
    let portrait = read_portrait(portrait_path)?;

    let head_pose = match head_pose {
        HeadPose::RetainFromPortrait => None,
        HeadPose::UserDefined => {
            let rotation = inputs.head_rotation.as_deref().ok_or_else(|| {
                A2f2dError::MissingInput {
                    what: "--head-rotation-animation-filepath".to_string(),
                }
            })?;
            let translation = inputs.head_translation.as_deref().ok_or_else(|| {
                A2f2dError::MissingInput {
                    what: "--head-translation-animation-filepath".to_string(),
                }
            })?;
            Some(HeadPoseAnimation::load(rotation, translation)?)
        }
    };

    tracing::info!(
        audio = %audio.path.display(),
        format = %audio.format,
        portrait_bytes = portrait.len(),
        "Inputs validated"
    );

    Ok(MaterializedInputs {
        portrait,
        audio,
        head_pose,
    })
}

fn read_portrait(path: &Path) -> Result<Bytes> {
    require_file(path)?;
    let data = std::fs::read(path).map_err(|e| A2f2dError::InputRead {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    if data.is_empty() {
        return Err(A2f2dError::InputRead {
            path: path.display().to_string(),
            message: "portrait image is empty".to_string(),
        });
    }
    Ok(Bytes::from(data))
}
