//! A named set of tracks, one per channel.

use serde::Serialize;

use crate::error::StreamError;
use crate::keyframe::{
    BackpackLightsKeyFrame, BodyMotionKeyFrame, EventKeyFrame, FaceAnimationKeyFrame,
    FaceImageKeyFrame, HeadAngleKeyFrame, KeyFrame, LiftHeightKeyFrame, ProceduralFaceKeyFrame,
    RecordHeadingKeyFrame, RobotAudioKeyFrame, TurnToRecordedHeadingKeyFrame,
};
use crate::track::Track;

/// Expands `$body` once per track field.
macro_rules! each_track {
    ($self:expr, |mut $t:ident| $body:expr) => {{
        { let $t = &mut $self.head_angle; $body }
        { let $t = &mut $self.lift_height; $body }
        { let $t = &mut $self.body_motion; $body }
        { let $t = &mut $self.record_heading; $body }
        { let $t = &mut $self.turn_to_recorded_heading; $body }
        { let $t = &mut $self.robot_audio; $body }
        { let $t = &mut $self.face_image; $body }
        { let $t = &mut $self.face_animation; $body }
        { let $t = &mut $self.procedural_face; $body }
        { let $t = &mut $self.backpack_lights; $body }
        { let $t = &mut $self.event; $body }
    }};
    ($self:expr, |$t:ident| $body:expr) => {{
        { let $t = &$self.head_angle; $body }
        { let $t = &$self.lift_height; $body }
        { let $t = &$self.body_motion; $body }
        { let $t = &$self.record_heading; $body }
        { let $t = &$self.turn_to_recorded_heading; $body }
        { let $t = &$self.robot_audio; $body }
        { let $t = &$self.face_image; $body }
        { let $t = &$self.face_animation; $body }
        { let $t = &$self.procedural_face; $body }
        { let $t = &$self.backpack_lights; $body }
        { let $t = &$self.event; $body }
    }};
}

/// An authored clip, or the runtime-built procedural animation when live.
///
/// Must be [`init`](Animation::init)ialized before it is streamed and again
/// before each loop pass.
#[derive(Clone, Debug, Default)]
pub struct Animation {
    name: String,
    initialized: bool,
    is_live: bool,
    pub head_angle: Track<HeadAngleKeyFrame>,
    pub lift_height: Track<LiftHeightKeyFrame>,
    pub body_motion: Track<BodyMotionKeyFrame>,
    pub record_heading: Track<RecordHeadingKeyFrame>,
    pub turn_to_recorded_heading: Track<TurnToRecordedHeadingKeyFrame>,
    pub robot_audio: Track<RobotAudioKeyFrame>,
    pub face_image: Track<FaceImageKeyFrame>,
    pub face_animation: Track<FaceAnimationKeyFrame>,
    pub procedural_face: Track<ProceduralFaceKeyFrame>,
    pub backpack_lights: Track<BackpackLightsKeyFrame>,
    pub event: Track<EventKeyFrame>,
}

/// Shape of an animation, for logging and tooling.
#[derive(Clone, Debug, Serialize)]
pub struct AnimationSummary {
    pub name: String,
    pub num_keyframes: usize,
    pub length_ms: u32,
}

impl Animation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rewind every track and mark the animation playable.
    pub fn init(&mut self) {
        each_track!(self, |mut t| t.move_to_start());
        for kf in self.face_animation.iter_mut() {
            kf.reset();
        }
        self.initialized = true;
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Drop all keyframes; the animation must be re-initialized afterwards.
    pub fn clear(&mut self) {
        each_track!(self, |mut t| t.clear());
        self.initialized = false;
    }

    pub fn has_frames_left(&self) -> bool {
        let mut any = false;
        each_track!(self, |t| any |= t.has_frames_left());
        any
    }

    pub fn is_empty(&self) -> bool {
        let mut empty = true;
        each_track!(self, |t| empty &= t.is_empty());
        empty
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.is_live
    }

    pub fn set_is_live(&mut self, is_live: bool) {
        self.is_live = is_live;
        each_track!(self, |mut t| t.set_is_live(is_live));
    }

    pub fn num_keyframes(&self) -> usize {
        let mut n = 0;
        each_track!(self, |t| n += t.len());
        n
    }

    /// Route a keyframe to its channel's track.
    pub fn add_keyframe(&mut self, keyframe: KeyFrame) -> Result<(), StreamError> {
        match keyframe {
            KeyFrame::HeadAngle(kf) => self.head_angle.add_keyframe(kf),
            KeyFrame::LiftHeight(kf) => self.lift_height.add_keyframe(kf),
            KeyFrame::BodyMotion(kf) => self.body_motion.add_keyframe(kf),
            KeyFrame::RecordHeading(kf) => self.record_heading.add_keyframe(kf),
            KeyFrame::TurnToRecordedHeading(kf) => self.turn_to_recorded_heading.add_keyframe(kf),
            KeyFrame::RobotAudio(kf) => self.robot_audio.add_keyframe(kf),
            KeyFrame::FaceImage(kf) => self.face_image.add_keyframe(kf),
            KeyFrame::FaceAnimation(kf) => self.face_animation.add_keyframe(kf),
            KeyFrame::ProceduralFace(kf) => self.procedural_face.add_keyframe(kf),
            KeyFrame::BackpackLights(kf) => self.backpack_lights.add_keyframe(kf),
            KeyFrame::Event(kf) => self.event.add_keyframe(kf),
        }
    }

    /// Every keyframe, ordered by track then time.
    pub fn keyframes(&self) -> Vec<KeyFrame> {
        let mut out = Vec::with_capacity(self.num_keyframes());
        out.extend(self.head_angle.iter().cloned().map(KeyFrame::HeadAngle));
        out.extend(self.lift_height.iter().cloned().map(KeyFrame::LiftHeight));
        out.extend(self.body_motion.iter().cloned().map(KeyFrame::BodyMotion));
        out.extend(self.record_heading.iter().cloned().map(KeyFrame::RecordHeading));
        out.extend(
            self.turn_to_recorded_heading
                .iter()
                .cloned()
                .map(KeyFrame::TurnToRecordedHeading),
        );
        out.extend(self.robot_audio.iter().cloned().map(KeyFrame::RobotAudio));
        out.extend(self.face_image.iter().cloned().map(KeyFrame::FaceImage));
        out.extend(self.face_animation.iter().cloned().map(KeyFrame::FaceAnimation));
        out.extend(self.procedural_face.iter().cloned().map(KeyFrame::ProceduralFace));
        out.extend(self.backpack_lights.iter().cloned().map(KeyFrame::BackpackLights));
        out.extend(self.event.iter().cloned().map(KeyFrame::Event));
        out
    }

    /// Append `other` so that it starts one tick after this animation's last
    /// keyframe (at 0 when this animation is empty).
    pub fn append_animation(&mut self, other: &Animation, tick_ms: u32) -> Result<(), StreamError> {
        let offset = if self.is_empty() {
            0
        } else {
            self.last_keyframe_time_ms() + tick_ms
        };
        for mut kf in other.keyframes() {
            kf.set_trigger_time_ms(kf.trigger_time_ms() + offset);
            self.add_keyframe(kf)?;
        }
        Ok(())
    }

    /// Latest trigger time over all tracks.
    pub fn last_keyframe_time_ms(&self) -> u32 {
        let mut last = 0;
        each_track!(self, |t| last = last.max(t.last_trigger_time_ms()));
        last
    }

    /// Latest trigger-plus-duration over all tracks.
    pub fn last_keyframe_end_time_ms(&self) -> u32 {
        let mut last = 0;
        each_track!(self, |t| last = last.max(t.last_end_time_ms()));
        last
    }

    pub fn summary(&self) -> AnimationSummary {
        AnimationSummary {
            name: self.name.clone(),
            num_keyframes: self.num_keyframes(),
            length_ms: self.last_keyframe_end_time_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Animation {
        let mut anim = Animation::new("sample");
        anim.add_keyframe(KeyFrame::HeadAngle(HeadAngleKeyFrame::new(0, 10, 0, 200)))
            .unwrap();
        anim.add_keyframe(KeyFrame::Event(EventKeyFrame::new(300, "ping")))
            .unwrap();
        anim
    }

    #[test]
    fn init_and_clear_toggle_state() {
        let mut anim = sample();
        assert!(!anim.is_initialized());
        anim.init();
        assert!(anim.is_initialized());
        assert!(anim.has_frames_left());
        anim.clear();
        assert!(anim.is_empty());
        assert!(!anim.is_initialized());
    }

    #[test]
    fn end_times_cover_durations() {
        let anim = sample();
        assert_eq!(anim.last_keyframe_time_ms(), 300);
        assert_eq!(anim.last_keyframe_end_time_ms(), 300);
        assert_eq!(anim.summary().num_keyframes, 2);
    }

    #[test]
    fn append_shifts_by_one_tick() {
        let mut anim = sample();
        anim.append_animation(&sample(), 33).unwrap();
        assert_eq!(anim.head_angle.last_trigger_time_ms(), 333);
        assert_eq!(anim.last_keyframe_time_ms(), 633);

        let mut empty = Animation::new("empty");
        empty.append_animation(&sample(), 33).unwrap();
        assert_eq!(empty.last_keyframe_time_ms(), 300);
    }

    #[test]
    fn live_animation_consumes_frames() {
        let mut anim = sample();
        anim.set_is_live(true);
        anim.init();
        anim.event.advance();
        assert!(anim.event.is_empty());
        assert!(anim.head_angle.is_live());
    }
}
