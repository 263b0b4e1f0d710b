//! The one-time animate config that opens every session.

use crate::config::{AnimationConfig, CropMode, HeadPose, ModelSelection};
use crate::error::{A2f2dError, Result};
use crate::input::{HeadPoseAnimation, MaterializedInputs};
use crate::proto::{
    self, AnimateConfig, AnimateRequest, AnimationCroppingMode, HeadPoseMode, Quaternion,
    QuaternionStream, Vector3f, Vector3fStream, animate_request,
};
use crate::transport::UploadSender;

/// Build the config message from animation settings and loaded inputs.
///
/// Rotation and translation sequences are attached only in user-defined
/// head-pose mode, which then requires them.
pub fn build_config(settings: &AnimationConfig, inputs: &MaterializedInputs) -> Result<AnimateConfig> {
    let (head_pose_mode, rotation, translation) = match settings.head_pose {
        HeadPose::RetainFromPortrait => (HeadPoseMode::RetainFromPortraitImage, None, None),
        HeadPose::UserDefined => {
            let animation = inputs
                .head_pose
                .as_ref()
                .ok_or_else(|| A2f2dError::MissingInput {
                    what: "head pose animation tables".to_string(),
                })?;
            let (rotation, translation) = pose_streams(animation);
            (
                HeadPoseMode::UserDefinedAnimation,
                Some(rotation),
                Some(translation),
            )
        }
    };

    Ok(AnimateConfig {
        portrait_image: inputs.portrait.clone(),
        model_selection: model(settings.model) as i32,
        animation_crop_mode: crop(settings.crop_mode) as i32,
        enable_lookaway: u32::from(settings.enable_lookaway),
        lookaway_max_offset: settings.lookaway_max_offset,
        lookaway_interval_min: settings.lookaway_interval_min,
        lookaway_interval_range: settings.lookaway_interval_range,
        blink_frequency: settings.blink_frequency,
        blink_duration: settings.blink_duration,
        mouth_expression_multiplier: settings.mouth_expression_multiplier,
        head_pose_mode: head_pose_mode as i32,
        head_pose_multiplier: settings.head_pose_multiplier,
        input_head_rotation: rotation,
        input_head_translation: translation,
    })
}

/// Queue `config` as the first outbound message.
///
/// Must run before the transport is opened so nothing can overtake it.
pub async fn queue_config(outbound: &UploadSender, config: AnimateConfig) -> Result<()> {
    let request = AnimateRequest {
        stream_input: Some(animate_request::StreamInput::Config(config)),
    };
    outbound
        .send(request.into())
        .await
        .map_err(|_| A2f2dError::Transport {
            message: "outbound stream closed before the config was sent".to_string(),
        })
}

fn pose_streams(animation: &HeadPoseAnimation) -> (QuaternionStream, Vector3fStream) {
    let rotation = QuaternionStream {
        values: animation
            .rotation
            .iter()
            .map(|&[x, y, z, w]| Quaternion { x, y, z, w })
            .collect(),
    };
    let translation = Vector3fStream {
        values: animation
            .translation
            .iter()
            .map(|&[x, y, z]| Vector3f { x, y, z })
            .collect(),
    };
    (rotation, translation)
}

fn model(selection: ModelSelection) -> proto::ModelSelection {
    match selection {
        ModelSelection::Performance => proto::ModelSelection::Perf,
        ModelSelection::Quality => proto::ModelSelection::Quality,
    }
}

fn crop(mode: CropMode) -> AnimationCroppingMode {
    match mode {
        CropMode::Facebox => AnimationCroppingMode::Facebox,
        CropMode::RegistrationBlending => AnimationCroppingMode::RegistrationBlending,
        CropMode::InsetBlending => AnimationCroppingMode::InsetBlending,
    }
}
