//! Procedural face generator: keep-alive, blinks, squints, eye shifts and
//! glitches, all as layers of procedural face keyframes.

use animstream_face_core::ProceduralFace;
use rand::{Rng, RngCore};

use crate::config::{KeepAliveParams, MAX_BLINK_SPACING_FOR_SCREEN_PROTECTION_MS};
use crate::error::StreamError;
use crate::ids::LayerTag;
use crate::keyframe::{KeyFrameKind, ProceduralFaceKeyFrame};
use crate::layers::manager::LayerManager;
use crate::track::Track;

pub const KEEP_ALIVE_EYE_DART_LAYER: &str = "KeepAliveEyeDart";
pub const KEEP_ALIVE_BLINK_LAYER: &str = "KeepAliveBlink";
pub const KEEP_ALIVE_NOISE_LAYER: &str = "KeepAliveEyeNoise";

/// Gaze offset that reaches full eye scaling in `look_at`.
const EYE_DART_LOOK_LIMIT_PX: f32 = 5.0;
/// Fallback blink spacing when the configured range is empty.
const FALLBACK_BLINK_SPACING_MS: (u32, u32) = (7_500, 30_000);
const SQUINT_BLEND_IN_MS: u32 = 250;

/// Blink shape: (time offset, eye scale y, eye scale x).
const BLINK_FRAMES: [(u32, f32, f32); 6] = [
    (0, 1.0, 1.0),
    (33, 0.6, 1.02),
    (66, 0.1, 1.05),
    (100, 0.1, 1.05),
    (133, 0.6, 1.02),
    (166, 1.0, 1.0),
];

/// Row-shift profile of a glitch, in pixels per unit of degree.
const GLITCH_DISTORTION: [f32; 11] = [1.0, 1.0, 2.0, 1.0, 4.0, 10.0, -1.0, -9.0, -5.0, 2.0, -2.0];

/// Gaze limits for eye shifts.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EyeShiftLimits {
    pub xmax: f32,
    pub ymax: f32,
    pub look_up_max_scale: f32,
    pub look_down_min_scale: f32,
    pub outer_eye_scale_increase: f32,
}

impl Default for EyeShiftLimits {
    fn default() -> Self {
        Self {
            xmax: 25.0,
            ymax: 20.0,
            look_up_max_scale: 1.1,
            look_down_min_scale: 0.85,
            outer_eye_scale_increase: 0.1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FaceLayerManager {
    layers: LayerManager<ProceduralFaceKeyFrame>,
    tick_ms: u32,
    eye_dart_tag: Option<LayerTag>,
    // None means due now.
    next_blink_ms: Option<u32>,
    next_eye_dart_ms: Option<u32>,
}

fn face_track(frames: impl IntoIterator<Item = ProceduralFaceKeyFrame>) -> Track<ProceduralFaceKeyFrame> {
    let mut track = Track::new();
    for kf in frames {
        // generated frames are always in order
        if let Err(e) = track.add_keyframe(kf) {
            log::warn!("FaceLayerManager: dropped keyframe: {e}");
        }
    }
    track
}

fn neutral(trigger_time_ms: u32) -> ProceduralFaceKeyFrame {
    ProceduralFaceKeyFrame::new(trigger_time_ms, ProceduralFace::default())
}

/// Uniform pick from `[lo, hi]`, tolerating a reversed range.
fn pick_u32(rng: &mut dyn RngCore, lo: u32, hi: u32) -> u32 {
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    rng.gen_range(lo..=hi)
}

impl FaceLayerManager {
    pub fn new(tick_ms: u32) -> Self {
        Self {
            layers: LayerManager::new(),
            tick_ms,
            eye_dart_tag: None,
            next_blink_ms: None,
            next_eye_dart_ms: None,
        }
    }

    #[inline]
    pub fn layers(&self) -> &LayerManager<ProceduralFaceKeyFrame> {
        &self.layers
    }

    #[inline]
    pub fn has_layers(&self) -> bool {
        self.layers.has_layers()
    }

    pub fn clear(&mut self) {
        self.layers.clear();
        self.eye_dart_tag = None;
    }

    #[inline]
    pub fn max_blink_spacing_for_screen_protection_ms() -> u32 {
        MAX_BLINK_SPACING_FOR_SCREEN_PROTECTION_MS
    }

    /// Make the next blink and eye dart due immediately.
    pub fn reset_keep_alive_timers(&mut self) {
        self.next_blink_ms = None;
        self.next_eye_dart_ms = None;
    }

    /// One keep-alive step: eye darts when nothing else moves the eyes,
    /// blinks on their own spacing, and a neutral frame otherwise so the face
    /// keeps being drawn.
    pub fn keep_face_alive(&mut self, params: &KeepAliveParams, now_ms: u32, rng: &mut dyn RngCore) {
        let mut added = false;

        if self.next_eye_dart_ms.map_or(true, |t| now_ms >= t) {
            let dart_layer = self.eye_dart_tag.filter(|t| self.layers.has_layer(*t));
            let only_dart = match dart_layer {
                Some(_) => self.layers.num_layers() == 1,
                None => !self.layers.has_layers(),
            };
            if only_dart {
                self.add_eye_dart(params, dart_layer, now_ms, rng);
                added = true;
            }
            self.next_eye_dart_ms = Some(
                now_ms + pick_u32(rng, params.eye_dart_spacing_min_ms, params.eye_dart_spacing_max_ms),
            );
        }

        if self.next_blink_ms.map_or(true, |t| now_ms >= t) {
            self.add_blink(KEEP_ALIVE_BLINK_LAYER);
            added = true;
            let (lo, hi) = if params.blink_spacing_max_ms <= params.blink_spacing_min_ms {
                log::warn!(
                    "FaceLayerManager.KeepFaceAlive: blink spacing max {} <= min {}, using {:?}",
                    params.blink_spacing_max_ms,
                    params.blink_spacing_min_ms,
                    FALLBACK_BLINK_SPACING_MS
                );
                FALLBACK_BLINK_SPACING_MS
            } else {
                (params.blink_spacing_min_ms, params.blink_spacing_max_ms)
            };
            self.next_blink_ms = Some(now_ms + pick_u32(rng, lo, hi));
        }

        if !added && !self.layers.has_layer_named(KEEP_ALIVE_NOISE_LAYER) {
            self.layers
                .add_layer(KEEP_ALIVE_NOISE_LAYER, face_track([neutral(0)]));
        }
    }

    fn add_eye_dart(
        &mut self,
        params: &KeepAliveParams,
        existing: Option<LayerTag>,
        now_ms: u32,
        rng: &mut dyn RngCore,
    ) {
        let dist = params.eye_dart_max_distance_px.abs();
        let x = rng.gen_range(-dist..=dist);
        let y = rng.gen_range(-dist..=dist);
        let duration = pick_u32(rng, params.eye_dart_min_duration_ms, params.eye_dart_max_duration_ms);

        let mut face = ProceduralFace::default();
        face.look_at(
            x,
            y,
            EYE_DART_LOOK_LIMIT_PX,
            EYE_DART_LOOK_LIMIT_PX,
            params.eye_dart_up_max_scale,
            params.eye_dart_down_min_scale,
            params.eye_dart_outer_eye_scale_increase,
        );
        let dart = ProceduralFaceKeyFrame::new(duration, face);

        match existing {
            Some(tag) => {
                if let Err(e) = self.layers.add_to_persistent_layer(tag, [dart], now_ms) {
                    log::warn!("FaceLayerManager.KeepFaceAlive: eye dart not added: {e}");
                }
            }
            None => {
                let tag = self
                    .layers
                    .add_persistent_layer(KEEP_ALIVE_EYE_DART_LAYER, face_track([neutral(0), dart]));
                self.eye_dart_tag = Some(tag);
            }
        }
    }

    /// Blend the eye dart back to neutral over `duration_ms`.
    pub fn remove_keep_face_alive(&mut self, duration_ms: u32, now_ms: u32) {
        if let Some(tag) = self.eye_dart_tag.take() {
            if self.layers.has_layer(tag) {
                if let Err(e) = self
                    .layers
                    .remove_persistent_layer(tag, duration_ms, neutral(0), now_ms)
                {
                    log::warn!("FaceLayerManager.RemoveKeepFaceAlive: eye dart not removed: {e}");
                }
            }
        }
    }

    pub fn add_blink(&mut self, name: &str) -> LayerTag {
        let frames = BLINK_FRAMES.iter().map(|&(ms, scale_y, scale_x)| {
            let mut face = ProceduralFace::default();
            face.set_both_eyes(|eye| {
                eye.scale_y = scale_y;
                eye.scale_x = scale_x;
            });
            ProceduralFaceKeyFrame::new(ms, face)
        });
        self.layers.add_layer(name, face_track(frames))
    }

    /// Persistent squint, blended in over a quarter second.
    pub fn add_squint(&mut self, name: &str, scale_x: f32, scale_y: f32, upper_lid_angle_deg: f32) -> LayerTag {
        let mut face = ProceduralFace::default();
        face.left_eye.upper_lid_angle_deg = upper_lid_angle_deg;
        face.right_eye.upper_lid_angle_deg = -upper_lid_angle_deg;
        face.set_both_eyes(|eye| {
            eye.scale_x = scale_x;
            eye.scale_y = scale_y;
        });
        self.layers.add_persistent_layer(
            name,
            face_track([neutral(0), ProceduralFaceKeyFrame::new(SQUINT_BLEND_IN_MS, face)]),
        )
    }

    pub fn remove_squint(&mut self, tag: LayerTag, duration_ms: u32, now_ms: u32) -> Result<(), StreamError> {
        self.layers
            .remove_persistent_layer(tag, duration_ms, neutral(0), now_ms)
    }

    /// Shift the gaze to `(x, y)` over `duration_ms`. Updates the layer in
    /// `tag` when it still exists, otherwise creates one and stores its tag.
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
        let mut face = ProceduralFace::default();
        face.look_at(
            x,
            y,
            limits.xmax,
            limits.ymax,
            limits.look_up_max_scale,
            limits.look_down_min_scale,
            limits.outer_eye_scale_increase,
        );
        let shift = ProceduralFaceKeyFrame::new(duration_ms, face);

        match tag.filter(|t| self.layers.has_layer(*t)) {
            Some(existing) => self.layers.add_to_persistent_layer(existing, [shift], now_ms),
            None => {
                *tag = Some(
                    self.layers
                        .add_persistent_layer(name, face_track([neutral(0), shift])),
                );
                Ok(())
            }
        }
    }

    pub fn remove_eye_shift(&mut self, tag: LayerTag, duration_ms: u32, now_ms: u32) -> Result<(), StreamError> {
        self.layers
            .remove_persistent_layer(tag, duration_ms, neutral(0), now_ms)
    }

    /// Scanline-distortion burst, one frame per tick, scaled by `degree`.
    pub fn add_glitch(&mut self, degree: f32, rng: &mut dyn RngCore) -> LayerTag {
        let tick = self.tick_ms.max(1);
        let mut frames: Vec<ProceduralFaceKeyFrame> = GLITCH_DISTORTION
            .iter()
            .enumerate()
            .map(|(i, &shift)| {
                let jitter: f32 = rng.gen_range(0.75..=1.25);
                let face = ProceduralFace {
                    scanline_distortion_px: shift * degree * jitter,
                    ..ProceduralFace::default()
                };
                ProceduralFaceKeyFrame::new(i as u32 * tick, face)
            })
            .collect();
        frames.push(neutral(GLITCH_DISTORTION.len() as u32 * tick));
        self.layers.add_layer("Glitch", face_track(frames))
    }

    pub fn remove_layer(&mut self, tag: LayerTag) -> bool {
        self.layers.remove_layer(tag)
    }

    /// Combine every due layer onto `face`. True when any layer contributed.
    pub fn apply(&mut self, now_ms: u32, face: &mut ProceduralFace) -> bool {
        self.layers.seek(now_ms);
        let mut any = false;
        for layer in self.layers.iter() {
            let t = layer.layer_time_ms(now_ms);
            let Some(cur) = layer.track.current() else {
                continue;
            };
            if !cur.is_time_to_play(t) {
                continue;
            }
            face.combine(&cur.interpolated_face(layer.track.peek_next(), t));
            any = true;
        }
        any
    }

    pub fn update(&mut self, now_ms: u32) {
        self.layers.update(now_ms);
        if self.eye_dart_tag.is_some_and(|t| !self.layers.has_layer(t)) {
            self.eye_dart_tag = None;
        }
    }
}
