//! Animstream animation core
//!
//! Keyframe tracks, animations and the tick-driven streamer that plays them on
//! a robot: head, lift and body motion, backpack lights, audio, events and the
//! face display. Procedural layers (keep-alive, blinks, squints, eye shifts,
//! glitches, ambient lights and sounds) run on the same clock and are merged
//! into whatever streams, or played on their own when nothing does.
//!
//! The streamer is generic over its collaborators ([`Transport`],
//! [`DisplaySink`], [`AudioClient`]) and reads animations through an
//! [`AnimationLoader`], so it runs the same against the robot or a test
//! harness.

pub mod animation;
pub mod config;
pub mod error;
pub mod flags;
pub mod ids;
pub mod interfaces;
pub mod keyframe;
pub mod layers;
pub mod loader;
pub mod messages;
pub mod streamer;
pub mod track;

// Re-exports for consumers
pub use animation::{Animation, AnimationSummary};
pub use config::{Config, KeepAliveParam, KeepAliveParams};
pub use error::StreamError;
pub use flags::TrackFlags;
pub use ids::{LayerTag, Tag};
pub use interfaces::{AnimationLoader, AudioClient, DisplaySink, Transport};
pub use keyframe::{
    AudioRef, BackpackLightsKeyFrame, BodyMotionKeyFrame, BodyRadius, EventKeyFrame,
    FaceAnimationKeyFrame, FaceImageKeyFrame, HeadAngleKeyFrame, KeyFrame, KeyFrameKind,
    LiftHeightKeyFrame, ProceduralFaceKeyFrame, RecordHeadingKeyFrame, RobotAudioKeyFrame,
    TurnToRecordedHeadingKeyFrame,
};
pub use layers::{EyeShiftLimits, LayeredKeyFrames, TrackLayerComponent};
pub use loader::{parse_animations_json, AnimationLibrary};
pub use messages::{BackpackLights, Message, Rgb, RobotCommand};
pub use streamer::{AnimationStreamer, SessionSummary};
pub use track::Track;

pub use animstream_face_core as face;
