//! Outbound messages.
//!
//! `Message` is everything the streamer hands to the transport: upstream
//! notifications about sessions and hardware commands for the robot. Face
//! images are not messages; they go to the display sink.

use serde::{Deserialize, Serialize};

use crate::flags::TrackFlags;
use crate::ids::Tag;

/// Backpack light zones, in the order of [`BackpackLights::zones`].
pub const NUM_BACKPACK_ZONES: usize = 5;

/// Linear RGB in `0..=1`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const OFF: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// Colors for front, middle, back, left and right zones.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BackpackLights {
    pub zones: [Rgb; NUM_BACKPACK_ZONES],
}

/// Hardware commands produced by keyframes or synthesized by the streamer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RobotCommand {
    SetHeadAngle {
        angle_rad: f32,
        duration_sec: f32,
    },
    SetLiftHeight {
        height_mm: f32,
        duration_sec: f32,
    },
    /// Arc drive. `curvature_radius_mm` 0 turns in place (speed in rad/s);
    /// `i16::MAX` drives straight.
    DriveArc {
        speed: f32,
        accel: f32,
        curvature_radius_mm: i16,
    },
    RecordHeading,
    TurnToRecordedHeading {
        offset_deg: i16,
        speed_deg_per_sec: i16,
        accel_deg_per_sec2: i16,
        decel_deg_per_sec2: i16,
        tolerance_deg: u16,
        num_half_revs: u16,
        use_shortest_dir: bool,
    },
    SetBackpackLights {
        lights: BackpackLights,
    },
    MoveHead {
        speed_rad_per_sec: f32,
    },
    MoveLift {
        speed_rad_per_sec: f32,
    },
    DriveWheels {
        left_mmps: f32,
        right_mmps: f32,
        left_accel_mmps2: f32,
        right_accel_mmps2: f32,
    },
}

impl RobotCommand {
    /// The zero-speed arc that halts body motion.
    pub const STOP_ARC: RobotCommand = RobotCommand::DriveArc {
        speed: 0.0,
        accel: 0.0,
        curvature_radius_mm: i16::MAX,
    };
}

/// Everything sent through the transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Message {
    AnimationStarted {
        name: String,
        tag: Tag,
    },
    AnimationEnded {
        name: String,
        tag: Tag,
        was_aborted: bool,
    },
    AnimationEvent {
        event_id: String,
        timestamp_ms: u32,
        tag: Tag,
    },
    /// Periodic heartbeat.
    AnimationState {
        num_proc_anim_face_keyframes: u32,
        locked_tracks: TrackFlags,
        tracks_in_use: TrackFlags,
    },
    /// Which backpack light layer the robot should show (1 = animation).
    BackpackSetLayer {
        layer: u8,
    },
    Robot(RobotCommand),
}

impl Message {
    #[inline]
    pub fn as_robot(&self) -> Option<&RobotCommand> {
        match self {
            Message::Robot(cmd) => Some(cmd),
            _ => None,
        }
    }
}

impl From<RobotCommand> for Message {
    fn from(cmd: RobotCommand) -> Self {
        Message::Robot(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_serialize() {
        let msg = Message::AnimationEnded {
            name: "wave".into(),
            tag: Tag(5),
            was_aborted: false,
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
