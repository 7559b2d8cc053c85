//! Procedural layers: ambient generators whose keyframes are merged with, or
//! stand in for, the streaming animation's face, backpack and audio tracks.
//!
//! Layers live on the engine clock (`now_ms`), not on any animation's clock,
//! so they survive across streaming sessions.

pub mod face;
pub mod manager;

use animstream_face_core::ProceduralFace;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::animation::Animation;
use crate::config::KeepAliveParams;
use crate::error::StreamError;
use crate::ids::LayerTag;
use crate::keyframe::{BackpackLightsKeyFrame, KeyFrameKind, RobotAudioKeyFrame};
use crate::track::Track;

pub use face::{EyeShiftLimits, FaceLayerManager};
pub use manager::{Layer, LayerManager};

/// Output of one layering pass. Each field is `None` when nothing is due on
/// that channel.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayeredKeyFrames {
    pub audio: Option<RobotAudioKeyFrame>,
    pub backpack: Option<BackpackLightsKeyFrame>,
    pub face: Option<ProceduralFace>,
    /// The face came (at least partly) from the animation's own procedural
    /// face track.
    pub authored_face: bool,
}

impl LayeredKeyFrames {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.audio.is_none() && self.backpack.is_none() && self.face.is_none()
    }
}

pub struct TrackLayerComponent {
    tick_ms: u32,
    rng: StdRng,
    face: FaceLayerManager,
    backpack: LayerManager<BackpackLightsKeyFrame>,
    audio: LayerManager<RobotAudioKeyFrame>,
}

impl TrackLayerComponent {
    pub fn new(tick_ms: u32, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            tick_ms,
            rng,
            face: FaceLayerManager::new(tick_ms),
            backpack: LayerManager::new(),
            audio: LayerManager::new(),
        }
    }

    /// Drop finished layers.
    pub fn update(&mut self, now_ms: u32) {
        self.face.update(now_ms);
        self.backpack.update(now_ms);
        self.audio.update(now_ms);
    }

    pub fn have_layers_to_send(&self) -> bool {
        self.face.has_layers() || self.backpack.has_layers() || self.audio.has_layers()
    }

    /// Evaluate the animation's procedural face track (when given) and every
    /// layer at `time_ms`. `start_ms` is when the animation started on the
    /// same clock.
    pub fn apply_layers_to_anim(
        &mut self,
        anim: Option<&mut Animation>,
        start_ms: u32,
        time_ms: u32,
        base_face: &ProceduralFace,
    ) -> LayeredKeyFrames {
        let mut out = LayeredKeyFrames::default();
        let mut face = base_face.clone();

        if let Some(anim) = anim {
            let anim_time = time_ms.saturating_sub(start_ms);
            let track = &mut anim.procedural_face;
            let mut advance = false;
            if let (Some(cur), next) = track.current_and_next() {
                if cur.is_time_to_play(anim_time) {
                    face = cur.interpolated_face(next, anim_time);
                    out.authored_face = true;
                    advance = match next {
                        Some(next) => next.trigger_time_ms() <= anim_time + self.tick_ms,
                        None => cur.is_done(self.tick_ms),
                    };
                }
            }
            if advance {
                track.advance();
            }
        }

        let layered = self.face.apply(time_ms, &mut face);
        if out.authored_face || layered {
            out.face = Some(face);
        }
        out.backpack = self.backpack.due_lights(time_ms);
        out.audio = self.audio.take_due_audio(time_ms);
        out
    }

    // ----- face -----

    #[inline]
    pub fn face_layers(&self) -> &FaceLayerManager {
        &self.face
    }

    pub fn keep_face_alive(&mut self, params: &KeepAliveParams, now_ms: u32) {
        self.face.keep_face_alive(params, now_ms, &mut self.rng);
    }

    pub fn remove_keep_face_alive(&mut self, duration_ms: u32, now_ms: u32) {
        self.face.remove_keep_face_alive(duration_ms, now_ms);
    }

    pub fn reset_keep_alive_timers(&mut self) {
        self.face.reset_keep_alive_timers();
    }

    pub fn add_blink(&mut self, name: &str) -> LayerTag {
        self.face.add_blink(name)
    }

    pub fn add_squint(&mut self, name: &str, scale_x: f32, scale_y: f32, upper_lid_angle_deg: f32) -> LayerTag {
        self.face.add_squint(name, scale_x, scale_y, upper_lid_angle_deg)
    }

    pub fn remove_squint(&mut self, tag: LayerTag, duration_ms: u32, now_ms: u32) -> Result<(), StreamError> {
        self.face.remove_squint(tag, duration_ms, now_ms)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_or_update_eye_shift(
        &mut self,
        tag: &mut Option<LayerTag>,
        name: &str,
        x: f32,
        y: f32,
        duration_ms: u32,
        limits: &EyeShiftLimits,
        now_ms: u32,
    ) -> Result<(), StreamError> {
        self.face
            .add_or_update_eye_shift(tag, name, x, y, duration_ms, limits, now_ms)
    }

    pub fn remove_eye_shift(&mut self, tag: LayerTag, duration_ms: u32, now_ms: u32) -> Result<(), StreamError> {
        self.face.remove_eye_shift(tag, duration_ms, now_ms)
    }

    pub fn add_glitch(&mut self, degree: f32) -> LayerTag {
        self.face.add_glitch(degree, &mut self.rng)
    }

    pub fn remove_face_layer(&mut self, tag: LayerTag) -> bool {
        self.face.remove_layer(tag)
    }

    // ----- backpack -----

    pub fn add_backpack_layer(&mut self, name: &str, track: Track<BackpackLightsKeyFrame>) -> LayerTag {
        self.backpack.add_layer(name, track)
    }

    pub fn add_persistent_backpack_layer(&mut self, name: &str, track: Track<BackpackLightsKeyFrame>) -> LayerTag {
        self.backpack.add_persistent_layer(name, track)
    }

    /// Ends a persistent backpack layer; lights go dark `duration_ms` later.
    pub fn remove_persistent_backpack_layer(
        &mut self,
        tag: LayerTag,
        duration_ms: u32,
        now_ms: u32,
    ) -> Result<(), StreamError> {
        self.backpack.remove_persistent_layer(
            tag,
            duration_ms,
            BackpackLightsKeyFrame::new(0, Default::default(), 0),
            now_ms,
        )
    }

    /// Stop all backpack layers at once.
    pub fn clear_backpack_layers(&mut self) {
        if self.backpack.has_layers() {
            log::debug!("TrackLayerComponent.ClearBackpackLayers: dropping {}", self.backpack.num_layers());
        }
        self.backpack.clear();
    }

    #[inline]
    pub fn backpack_layers(&self) -> &LayerManager<BackpackLightsKeyFrame> {
        &self.backpack
    }

    // ----- audio -----

    pub fn add_audio_layer(&mut self, name: &str, track: Track<RobotAudioKeyFrame>) -> LayerTag {
        self.audio.add_layer(name, track)
    }

    #[inline]
    pub fn audio_layers(&self) -> &LayerManager<RobotAudioKeyFrame> {
        &self.audio
    }

    /// Engine RNG, shared with keyframe variability and audio selection.
    #[inline]
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}
