//! Keyframes: one struct per channel plus the `KeyFrame` sum type.
//!
//! All keyframes carry a trigger time (ms from animation start). Motor and
//! light keyframes implement [`CommandKeyFrame`]: each tick the streamer asks
//! the current keyframe for a command (`try_emit`) and then whether it is done
//! (`is_done`), advancing the track when it is. Those two calls share the
//! keyframe's private play clock, so they must be called in that order once per
//! tick.

use animstream_face_core::{FaceAssetStore, FaceBitmap, ProceduralFace};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::flags::TrackFlags;
use crate::messages::{BackpackLights, RobotCommand};

pub const MAX_BODY_ROTATION_SPEED_DEG_PER_SEC: f32 = 300.0;
pub const MAX_WHEEL_SPEED_MMPS: f32 = 220.0;
/// Acceleration used for point turns, rad/s^2.
pub const POINT_TURN_ACCEL: f32 = 50.0;

/// Common keyframe contract.
pub trait KeyFrameKind: Clone + std::fmt::Debug {
    const TRACK: TrackFlags;
    const TRACK_NAME: &'static str;

    fn trigger_time_ms(&self) -> u32;
    fn set_trigger_time_ms(&mut self, trigger_time_ms: u32);

    fn duration_ms(&self) -> u32 {
        0
    }

    #[inline]
    fn is_time_to_play(&self, anim_time_ms: u32) -> bool {
        self.trigger_time_ms() <= anim_time_ms
    }

    #[inline]
    fn end_time_ms(&self) -> u32 {
        self.trigger_time_ms().saturating_add(self.duration_ms())
    }
}

/// Keyframes that turn into hardware commands.
pub trait CommandKeyFrame: KeyFrameKind {
    /// The command due this tick, if any.
    fn try_emit(&mut self, rng: &mut dyn RngCore) -> Option<RobotCommand>;
    /// Advance the play clock by one tick; true once the keyframe has finished
    /// (its clock is then rewound for the next loop).
    fn is_done(&mut self, tick_ms: u32) -> bool;
}

/// Shared duration bookkeeping: step the clock, rewind and report done once it
/// reaches `duration_ms`. A zero duration lasts one tick.
#[inline]
fn step_clock(current_ms: &mut u32, duration_ms: u32, tick_ms: u32) -> bool {
    *current_ms = current_ms.saturating_add(tick_ms);
    if *current_ms >= duration_ms {
        *current_ms = 0;
        true
    } else {
        false
    }
}

fn with_variability(base: f32, variability: u8, rng: &mut dyn RngCore) -> f32 {
    if variability == 0 {
        return base;
    }
    let v = variability as i32;
    base + rng.gen_range(-v..=v) as f32
}

macro_rules! impl_kind {
    ($ty:ty, $flag:expr, $name:literal) => {
        impl_kind!($ty, $flag, $name, |_kf| 0);
    };
    ($ty:ty, $flag:expr, $name:literal, |$kf:ident| $duration:expr) => {
        impl KeyFrameKind for $ty {
            const TRACK: TrackFlags = $flag;
            const TRACK_NAME: &'static str = $name;

            #[inline]
            fn trigger_time_ms(&self) -> u32 {
                self.trigger_time_ms
            }

            #[inline]
            fn set_trigger_time_ms(&mut self, trigger_time_ms: u32) {
                self.trigger_time_ms = trigger_time_ms;
            }

            #[inline]
            fn duration_ms(&self) -> u32 {
                let $kf = self;
                $duration
            }
        }
    };
}

// ----- head / lift -----

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadAngleKeyFrame {
    pub trigger_time_ms: u32,
    pub angle_deg: i8,
    /// Uniform random spread applied each time the keyframe plays.
    pub angle_variability_deg: u8,
    pub duration_ms: u32,
    #[serde(skip)]
    current_time_ms: u32,
}

impl HeadAngleKeyFrame {
    pub fn new(trigger_time_ms: u32, angle_deg: i8, angle_variability_deg: u8, duration_ms: u32) -> Self {
        Self {
            trigger_time_ms,
            angle_deg,
            angle_variability_deg,
            duration_ms,
            current_time_ms: 0,
        }
    }
}

impl_kind!(HeadAngleKeyFrame, TrackFlags::HEAD, "HeadAngle", |kf| kf.duration_ms);

impl CommandKeyFrame for HeadAngleKeyFrame {
    fn try_emit(&mut self, rng: &mut dyn RngCore) -> Option<RobotCommand> {
        if self.current_time_ms != 0 {
            return None;
        }
        let angle = with_variability(self.angle_deg as f32, self.angle_variability_deg, rng);
        Some(RobotCommand::SetHeadAngle {
            angle_rad: angle.to_radians(),
            duration_sec: self.duration_ms as f32 / 1000.0,
        })
    }

    fn is_done(&mut self, tick_ms: u32) -> bool {
        step_clock(&mut self.current_time_ms, self.duration_ms, tick_ms)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LiftHeightKeyFrame {
    pub trigger_time_ms: u32,
    pub height_mm: u8,
    pub height_variability_mm: u8,
    pub duration_ms: u32,
    #[serde(skip)]
    current_time_ms: u32,
}

impl LiftHeightKeyFrame {
    pub fn new(trigger_time_ms: u32, height_mm: u8, height_variability_mm: u8, duration_ms: u32) -> Self {
        Self {
            trigger_time_ms,
            height_mm,
            height_variability_mm,
            duration_ms,
            current_time_ms: 0,
        }
    }
}

impl_kind!(LiftHeightKeyFrame, TrackFlags::LIFT, "LiftHeight", |kf| kf.duration_ms);

impl CommandKeyFrame for LiftHeightKeyFrame {
    fn try_emit(&mut self, rng: &mut dyn RngCore) -> Option<RobotCommand> {
        if self.current_time_ms != 0 {
            return None;
        }
        let height = with_variability(self.height_mm as f32, self.height_variability_mm, rng);
        Some(RobotCommand::SetLiftHeight {
            height_mm: height.max(0.0),
            duration_sec: self.duration_ms as f32 / 1000.0,
        })
    }

    fn is_done(&mut self, tick_ms: u32) -> bool {
        step_clock(&mut self.current_time_ms, self.duration_ms, tick_ms)
    }
}

// ----- body -----

/// How the body moves for a [`BodyMotionKeyFrame`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyRadius {
    /// Turn in place; speed is in deg/s.
    PointTurn,
    Straight,
    /// Arc with this curvature radius; zero is a point turn.
    Arc(i16),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyMotionKeyFrame {
    pub trigger_time_ms: u32,
    /// mm/s, or rad/s for point turns.
    pub speed: f32,
    pub accel: f32,
    pub curvature_radius_mm: i16,
    pub duration_ms: u32,
    /// Send the implicit stop once the duration elapses.
    pub enable_stop_message: bool,
    #[serde(skip)]
    current_time_ms: u32,
}

impl BodyMotionKeyFrame {
    /// Build from authored units, clamping speed to the drive limits.
    pub fn new(trigger_time_ms: u32, speed: i16, radius: BodyRadius, duration_ms: u32) -> Self {
        let (speed, accel, curvature_radius_mm) = match radius {
            BodyRadius::PointTurn | BodyRadius::Arc(0) => {
                let deg = (speed as f32).clamp(
                    -MAX_BODY_ROTATION_SPEED_DEG_PER_SEC,
                    MAX_BODY_ROTATION_SPEED_DEG_PER_SEC,
                );
                (deg.to_radians(), POINT_TURN_ACCEL, 0)
            }
            BodyRadius::Straight => (
                (speed as f32).clamp(-MAX_WHEEL_SPEED_MMPS, MAX_WHEEL_SPEED_MMPS),
                0.0,
                i16::MAX,
            ),
            BodyRadius::Arc(r) => (
                (speed as f32).clamp(-MAX_WHEEL_SPEED_MMPS, MAX_WHEEL_SPEED_MMPS),
                0.0,
                r,
            ),
        };
        Self {
            trigger_time_ms,
            speed,
            accel,
            curvature_radius_mm,
            duration_ms,
            enable_stop_message: true,
            current_time_ms: 0,
        }
    }
}

impl_kind!(BodyMotionKeyFrame, TrackFlags::BODY, "BodyMotion", |kf| kf.duration_ms);

impl CommandKeyFrame for BodyMotionKeyFrame {
    fn try_emit(&mut self, _rng: &mut dyn RngCore) -> Option<RobotCommand> {
        if self.current_time_ms == 0 {
            Some(RobotCommand::DriveArc {
                speed: self.speed,
                accel: self.accel,
                curvature_radius_mm: self.curvature_radius_mm,
            })
        } else if self.enable_stop_message && self.current_time_ms >= self.duration_ms {
            Some(RobotCommand::STOP_ARC)
        } else {
            None
        }
    }

    fn is_done(&mut self, tick_ms: u32) -> bool {
        if !self.enable_stop_message || self.current_time_ms >= self.duration_ms {
            self.current_time_ms = 0;
            return true;
        }
        self.current_time_ms = self.current_time_ms.saturating_add(tick_ms);
        false
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordHeadingKeyFrame {
    pub trigger_time_ms: u32,
}

impl_kind!(RecordHeadingKeyFrame, TrackFlags::BODY, "RecordHeading");

impl CommandKeyFrame for RecordHeadingKeyFrame {
    fn try_emit(&mut self, _rng: &mut dyn RngCore) -> Option<RobotCommand> {
        Some(RobotCommand::RecordHeading)
    }

    fn is_done(&mut self, _tick_ms: u32) -> bool {
        true
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnToRecordedHeadingKeyFrame {
    pub trigger_time_ms: u32,
    pub offset_deg: i16,
    pub speed_deg_per_sec: i16,
    pub accel_deg_per_sec2: i16,
    pub decel_deg_per_sec2: i16,
    pub tolerance_deg: u16,
    pub num_half_revs: u16,
    pub use_shortest_dir: bool,
    pub duration_ms: u32,
    #[serde(skip)]
    current_time_ms: u32,
}

impl_kind!(
    TurnToRecordedHeadingKeyFrame,
    TrackFlags::BODY,
    "TurnToRecordedHeading",
    |kf| kf.duration_ms
);

impl CommandKeyFrame for TurnToRecordedHeadingKeyFrame {
    fn try_emit(&mut self, _rng: &mut dyn RngCore) -> Option<RobotCommand> {
        if self.current_time_ms != 0 {
            return None;
        }
        Some(RobotCommand::TurnToRecordedHeading {
            offset_deg: self.offset_deg,
            speed_deg_per_sec: self.speed_deg_per_sec,
            accel_deg_per_sec2: self.accel_deg_per_sec2,
            decel_deg_per_sec2: self.decel_deg_per_sec2,
            tolerance_deg: self.tolerance_deg,
            num_half_revs: self.num_half_revs,
            use_shortest_dir: self.use_shortest_dir,
        })
    }

    fn is_done(&mut self, tick_ms: u32) -> bool {
        step_clock(&mut self.current_time_ms, self.duration_ms, tick_ms)
    }
}

// ----- lights -----

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BackpackLightsKeyFrame {
    pub trigger_time_ms: u32,
    pub lights: BackpackLights,
    pub duration_ms: u32,
    #[serde(skip)]
    current_time_ms: u32,
}

impl BackpackLightsKeyFrame {
    pub fn new(trigger_time_ms: u32, lights: BackpackLights, duration_ms: u32) -> Self {
        Self {
            trigger_time_ms,
            lights,
            duration_ms,
            current_time_ms: 0,
        }
    }
}

impl_kind!(
    BackpackLightsKeyFrame,
    TrackFlags::BACKPACK_LIGHTS,
    "BackpackLights",
    |kf| kf.duration_ms
);

impl CommandKeyFrame for BackpackLightsKeyFrame {
    fn try_emit(&mut self, _rng: &mut dyn RngCore) -> Option<RobotCommand> {
        Some(RobotCommand::SetBackpackLights {
            lights: self.lights,
        })
    }

    fn is_done(&mut self, tick_ms: u32) -> bool {
        step_clock(&mut self.current_time_ms, self.duration_ms, tick_ms)
    }
}

// ----- audio -----

/// One candidate sound for an audio keyframe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AudioRef {
    pub event_id: String,
    pub volume: f32,
    /// Chance of this event being picked, `0..=1`.
    pub probability: f32,
}

impl AudioRef {
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            volume: 1.0,
            probability: 1.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotAudioKeyFrame {
    pub trigger_time_ms: u32,
    pub audio_refs: Vec<AudioRef>,
}

impl RobotAudioKeyFrame {
    pub fn new(trigger_time_ms: u32, audio_refs: Vec<AudioRef>) -> Self {
        Self {
            trigger_time_ms,
            audio_refs,
        }
    }

    /// Pick one candidate by probability weight. Nothing is picked when the
    /// list is empty, when the probabilities sum past one, or when the roll
    /// lands in the leftover "silence" share.
    pub fn select_audio_ref(&self, rng: &mut dyn RngCore) -> Option<&AudioRef> {
        if self.audio_refs.is_empty() {
            return None;
        }
        let total: f32 = self.audio_refs.iter().map(|a| a.probability).sum();
        if total > 1.0 + f32::EPSILON {
            log::warn!(
                "RobotAudioKeyFrame.SelectAudioRef: probabilities sum to {total:.3} at {}ms",
                self.trigger_time_ms
            );
            return None;
        }
        let roll: f32 = rng.gen();
        let mut cumulative = 0.0;
        for audio in &self.audio_refs {
            cumulative += audio.probability;
            if roll < cumulative {
                return Some(audio);
            }
        }
        None
    }
}

impl_kind!(RobotAudioKeyFrame, TrackFlags::AUDIO, "RobotAudio");

// ----- face -----

/// A raw bitmap shown for `duration_ms`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceImageKeyFrame {
    pub trigger_time_ms: u32,
    pub image: FaceBitmap,
    pub scanline_opacity: f32,
    pub duration_ms: u32,
    #[serde(skip)]
    current_time_ms: u32,
}

impl FaceImageKeyFrame {
    pub fn new(trigger_time_ms: u32, image: FaceBitmap, duration_ms: u32) -> Self {
        Self {
            trigger_time_ms,
            image,
            scanline_opacity: animstream_face_core::procedural::DEFAULT_SCANLINE_OPACITY,
            duration_ms,
            current_time_ms: 0,
        }
    }

    /// The image to draw while this keyframe is current.
    pub fn face_image(&self) -> FaceBitmap {
        let mut img = self.image.clone();
        img.apply_scanlines(self.scanline_opacity);
        img
    }

    pub fn is_done(&mut self, tick_ms: u32) -> bool {
        step_clock(&mut self.current_time_ms, self.duration_ms, tick_ms)
    }
}

impl_kind!(FaceImageKeyFrame, TrackFlags::FACE_IMAGE, "FaceImage", |kf| kf.duration_ms);

/// Plays the frames of a face asset store entry.
///
/// This is the one keyframe with mutable read state (the frame cursor); it has
/// to be [`reset`](Self::reset) when a session is aborted mid-sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceAnimationKeyFrame {
    pub trigger_time_ms: u32,
    pub anim_name: String,
    /// Time each frame stays up; one tick when absent.
    pub frame_duration_ms: Option<u32>,
    pub scanline_opacity: f32,
    #[serde(skip)]
    cur_frame: usize,
    #[serde(skip)]
    frame_elapsed_ms: u32,
}

impl FaceAnimationKeyFrame {
    pub fn new(trigger_time_ms: u32, anim_name: impl Into<String>) -> Self {
        Self {
            trigger_time_ms,
            anim_name: anim_name.into(),
            frame_duration_ms: None,
            scanline_opacity: animstream_face_core::procedural::DEFAULT_SCANLINE_OPACITY,
            cur_frame: 0,
            frame_elapsed_ms: 0,
        }
    }

    #[inline]
    pub fn current_frame(&self) -> usize {
        self.cur_frame
    }

    /// The frame to show this tick; advances the cursor when the frame's time
    /// is up. `None` once every frame was shown.
    pub fn next_frame(&mut self, store: &FaceAssetStore, tick_ms: u32) -> Option<FaceBitmap> {
        let mut img = store.decode_frame(&self.anim_name, self.cur_frame)?;
        img.apply_scanlines(self.scanline_opacity);

        let frame_duration = self.frame_duration_ms.unwrap_or(tick_ms).max(1);
        self.frame_elapsed_ms = self.frame_elapsed_ms.saturating_add(tick_ms);
        if self.frame_elapsed_ms >= frame_duration {
            self.frame_elapsed_ms -= frame_duration;
            self.cur_frame += 1;
        }
        Some(img)
    }

    pub fn is_done(&self, store: &FaceAssetStore) -> bool {
        self.cur_frame >= store.num_frames(&self.anim_name)
    }

    pub fn reset(&mut self) {
        self.cur_frame = 0;
        self.frame_elapsed_ms = 0;
    }
}

impl_kind!(FaceAnimationKeyFrame, TrackFlags::FACE_IMAGE, "FaceAnimation");

/// A parametric face; consecutive keyframes are interpolated.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProceduralFaceKeyFrame {
    pub trigger_time_ms: u32,
    pub face: ProceduralFace,
    /// How long the last keyframe of a track holds its face.
    pub duration_ms: u32,
    #[serde(skip)]
    current_time_ms: u32,
}

impl ProceduralFaceKeyFrame {
    pub fn new(trigger_time_ms: u32, face: ProceduralFace) -> Self {
        Self {
            trigger_time_ms,
            face,
            duration_ms: 0,
            current_time_ms: 0,
        }
    }

    pub fn with_duration(mut self, duration_ms: u32) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Face at `anim_time_ms`, blended toward `next` when there is one.
    pub fn interpolated_face(&self, next: Option<&ProceduralFaceKeyFrame>, anim_time_ms: u32) -> ProceduralFace {
        match next {
            Some(next) if next.trigger_time_ms > self.trigger_time_ms => {
                let span = (next.trigger_time_ms - self.trigger_time_ms) as f32;
                let elapsed = anim_time_ms.saturating_sub(self.trigger_time_ms) as f32;
                ProceduralFace::interpolate(&self.face, &next.face, (elapsed / span).min(1.0))
            }
            Some(next) => next.face.clone(),
            None => self.face.clone(),
        }
    }

    /// Used for the last keyframe of a track, which has no successor to reach.
    pub fn is_done(&mut self, tick_ms: u32) -> bool {
        step_clock(&mut self.current_time_ms, self.duration_ms, tick_ms)
    }
}

impl_kind!(
    ProceduralFaceKeyFrame,
    TrackFlags::PROCEDURAL_FACE,
    "ProceduralFace",
    |kf| kf.duration_ms
);

// ----- events -----

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventKeyFrame {
    pub trigger_time_ms: u32,
    pub event_id: String,
}

impl EventKeyFrame {
    pub fn new(trigger_time_ms: u32, event_id: impl Into<String>) -> Self {
        Self {
            trigger_time_ms,
            event_id: event_id.into(),
        }
    }
}

impl_kind!(EventKeyFrame, TrackFlags::EVENT, "Event");

// ----- sum type -----

/// Any keyframe, tagged by channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum KeyFrame {
    HeadAngle(HeadAngleKeyFrame),
    LiftHeight(LiftHeightKeyFrame),
    BodyMotion(BodyMotionKeyFrame),
    RecordHeading(RecordHeadingKeyFrame),
    TurnToRecordedHeading(TurnToRecordedHeadingKeyFrame),
    RobotAudio(RobotAudioKeyFrame),
    FaceImage(FaceImageKeyFrame),
    FaceAnimation(FaceAnimationKeyFrame),
    ProceduralFace(ProceduralFaceKeyFrame),
    BackpackLights(BackpackLightsKeyFrame),
    Event(EventKeyFrame),
}

macro_rules! dispatch {
    ($self:expr, $kf:ident => $body:expr) => {
        match $self {
            KeyFrame::HeadAngle($kf) => $body,
            KeyFrame::LiftHeight($kf) => $body,
            KeyFrame::BodyMotion($kf) => $body,
            KeyFrame::RecordHeading($kf) => $body,
            KeyFrame::TurnToRecordedHeading($kf) => $body,
            KeyFrame::RobotAudio($kf) => $body,
            KeyFrame::FaceImage($kf) => $body,
            KeyFrame::FaceAnimation($kf) => $body,
            KeyFrame::ProceduralFace($kf) => $body,
            KeyFrame::BackpackLights($kf) => $body,
            KeyFrame::Event($kf) => $body,
        }
    };
}

/// Static channel info of a keyframe type, usable through `dispatch!`.
fn kind_info<K: KeyFrameKind>(_kf: &K) -> (TrackFlags, &'static str) {
    (K::TRACK, K::TRACK_NAME)
}

impl KeyFrame {
    pub fn trigger_time_ms(&self) -> u32 {
        dispatch!(self, kf => kf.trigger_time_ms())
    }

    pub fn set_trigger_time_ms(&mut self, trigger_time_ms: u32) {
        dispatch!(self, kf => kf.set_trigger_time_ms(trigger_time_ms))
    }

    pub fn duration_ms(&self) -> u32 {
        dispatch!(self, kf => kf.duration_ms())
    }

    /// Lock/in-use flag of the channel this keyframe belongs to.
    pub fn track(&self) -> TrackFlags {
        dispatch!(self, kf => kind_info(kf).0)
    }

    pub fn kind_name(&self) -> &'static str {
        dispatch!(self, kf => kind_info(kf).1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const TICK: u32 = 33;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn head_emits_once_then_finishes_after_duration() {
        let mut rng = rng();
        let mut kf = HeadAngleKeyFrame::new(0, 20, 0, 100);
        let mut commands = 0;
        let mut ticks = 0;
        loop {
            if kf.try_emit(&mut rng).is_some() {
                commands += 1;
            }
            ticks += 1;
            if kf.is_done(TICK) {
                break;
            }
        }
        assert_eq!(commands, 1);
        assert_eq!(ticks, 4); // 33, 66, 99, 132 >= 100
        // rewound for the next loop
        assert!(kf.try_emit(&mut rng).is_some());
    }

    #[test]
    fn head_variability_stays_in_range() {
        let mut rng = rng();
        let mut kf = HeadAngleKeyFrame::new(0, 10, 5, 0);
        for _ in 0..50 {
            match kf.try_emit(&mut rng) {
                Some(RobotCommand::SetHeadAngle { angle_rad, .. }) => {
                    let deg = angle_rad.to_degrees();
                    assert!((4.99..=15.01).contains(&deg), "deg={deg}");
                }
                other => panic!("unexpected {other:?}"),
            }
            assert!(kf.is_done(TICK));
        }
    }

    #[test]
    fn body_motion_sends_stop_after_duration() {
        let mut rng = rng();
        let mut kf = BodyMotionKeyFrame::new(0, 100, BodyRadius::Straight, 66);
        let mut sent = Vec::new();
        loop {
            if let Some(cmd) = kf.try_emit(&mut rng) {
                sent.push(cmd);
            }
            if kf.is_done(TICK) {
                break;
            }
        }
        assert_eq!(sent.len(), 2);
        assert!(matches!(
            sent[0],
            RobotCommand::DriveArc { speed, curvature_radius_mm: i16::MAX, .. } if speed == 100.0
        ));
        assert_eq!(sent[1], RobotCommand::STOP_ARC);
    }

    #[test]
    fn body_motion_without_stop_is_done_immediately() {
        let mut rng = rng();
        let mut kf = BodyMotionKeyFrame::new(0, 100, BodyRadius::Arc(50), 500);
        kf.enable_stop_message = false;
        assert!(kf.try_emit(&mut rng).is_some());
        assert!(kf.is_done(TICK));
    }

    #[test]
    fn point_turn_converts_and_clamps() {
        let kf = BodyMotionKeyFrame::new(0, 1000, BodyRadius::PointTurn, 0);
        assert_eq!(kf.curvature_radius_mm, 0);
        assert_eq!(kf.accel, POINT_TURN_ACCEL);
        assert!((kf.speed - MAX_BODY_ROTATION_SPEED_DEG_PER_SEC.to_radians()).abs() < 1e-5);
        let straight = BodyMotionKeyFrame::new(0, -1000, BodyRadius::Straight, 0);
        assert_eq!(straight.speed, -MAX_WHEEL_SPEED_MMPS);
    }

    #[test]
    fn audio_selection_respects_weights() {
        let mut rng = rng();
        let certain = RobotAudioKeyFrame::new(0, vec![AudioRef::new("a")]);
        assert_eq!(certain.select_audio_ref(&mut rng).unwrap().event_id, "a");

        let over = RobotAudioKeyFrame::new(
            0,
            vec![
                AudioRef { probability: 0.8, ..AudioRef::new("a") },
                AudioRef { probability: 0.8, ..AudioRef::new("b") },
            ],
        );
        assert!(over.select_audio_ref(&mut rng).is_none());

        let never = RobotAudioKeyFrame::new(0, vec![AudioRef { probability: 0.0, ..AudioRef::new("a") }]);
        assert!(never.select_audio_ref(&mut rng).is_none());
        assert!(RobotAudioKeyFrame::default().select_audio_ref(&mut rng).is_none());
    }

    #[test]
    fn face_animation_walks_store_frames() {
        let mut store = FaceAssetStore::new();
        let mut lit = FaceBitmap::blank();
        lit.set(0, 0, true);
        store.add_image("eyes", &lit);
        store.add_image("eyes", &FaceBitmap::blank());

        let mut kf = FaceAnimationKeyFrame::new(0, "eyes");
        assert!(kf.next_frame(&store, TICK).unwrap().get(0, 0));
        assert!(!kf.is_done(&store));
        assert!(kf.next_frame(&store, TICK).unwrap().is_blank());
        assert!(kf.is_done(&store));
        assert!(kf.next_frame(&store, TICK).is_none());
        kf.reset();
        assert_eq!(kf.current_frame(), 0);
    }

    #[test]
    fn face_animation_holds_frames_for_frame_duration() {
        let mut store = FaceAssetStore::new();
        store.add_image("slow", &FaceBitmap::blank());
        let mut kf = FaceAnimationKeyFrame::new(0, "slow");
        kf.frame_duration_ms = Some(100);
        let mut ticks = 0;
        while kf.next_frame(&store, TICK).is_some() {
            ticks += 1;
        }
        assert_eq!(ticks, 4);
    }

    #[test]
    fn procedural_face_interpolates_toward_next() {
        let a = ProceduralFaceKeyFrame::new(0, ProceduralFace::default());
        let mut closed = ProceduralFace::default();
        closed.set_both_eyes(|e| e.scale_y = 0.0);
        let b = ProceduralFaceKeyFrame::new(100, closed);
        let mid = a.interpolated_face(Some(&b), 50);
        assert!((mid.left_eye.scale_y - 0.5).abs() < 1e-5);
        assert_eq!(a.interpolated_face(None, 50), ProceduralFace::default());
    }

    #[test]
    fn sum_type_reports_channel() {
        let kf = KeyFrame::Event(EventKeyFrame::new(10, "hit"));
        assert_eq!(kf.track(), TrackFlags::EVENT);
        assert_eq!(kf.kind_name(), "Event");
        assert_eq!(kf.trigger_time_ms(), 10);
        let mut body = KeyFrame::RecordHeading(RecordHeadingKeyFrame::default());
        body.set_trigger_time_ms(5);
        assert_eq!(body.track(), TrackFlags::BODY);
        assert_eq!(body.trigger_time_ms(), 5);
    }
}
