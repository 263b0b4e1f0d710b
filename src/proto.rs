//! Protobuf messages and gRPC client for `nvidia.maxine.audio2face2d.v1`,
//! generated from `proto/audio2face2d.proto` by the build script.

#![allow(clippy::all, clippy::unwrap_used, clippy::expect_used, unreachable_pub)]

include!(concat!(env!("OUT_DIR"), "/nvidia.maxine.audio2face2d.v1.rs"));

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn request_oneof_survives_encoding() {
        let request = AnimateRequest {
            stream_input: Some(animate_request::StreamInput::AudioFileData(
                ::prost::bytes::Bytes::from_static(b"RIFF"),
            )),
        };
        let decoded = AnimateRequest::decode(request.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn empty_response_decodes_without_payload() {
        let decoded = AnimateResponse::decode(&[][..]).unwrap();
        assert!(decoded.stream_output.is_none());
    }

    #[test]
    fn enum_accessors_map_raw_values() {
        let config = AnimateConfig {
            head_pose_mode: HeadPoseMode::UserDefinedAnimation as i32,
            model_selection: 99,
            ..Default::default()
        };
        assert_eq!(config.head_pose_mode(), HeadPoseMode::UserDefinedAnimation);
        // Unknown values fall back to the zero variant.
        assert_eq!(config.model_selection(), ModelSelection::Unspecified);
    }
}
