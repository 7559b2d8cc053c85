//! Parametric face description.
//!
//! A `ProceduralFace` is a set of per-eye parameters plus a face-level
//! transform. The default face is the identity for [`ProceduralFace::combine`]:
//! offsets are zero and scales one, so layering a default face changes nothing.

use serde::{Deserialize, Serialize};

use crate::bitmap::{FACE_HEIGHT, FACE_WIDTH};

pub const NOMINAL_EYE_WIDTH: f32 = 28.0;
pub const NOMINAL_EYE_HEIGHT: f32 = 40.0;
pub const NOMINAL_LEFT_EYE_X: f32 = 32.0;
pub const NOMINAL_RIGHT_EYE_X: f32 = 96.0;
pub const NOMINAL_EYE_Y: f32 = 32.0;

pub const DEFAULT_SCANLINE_OPACITY: f32 = 0.7;
pub const DEFAULT_SATURATION: f32 = 1.0;
pub const DEFAULT_LIGHTNESS: f32 = 1.0;
pub const DEFAULT_GLOW_SIZE: f32 = 2.0;

/// Marker for an optional parameter that has not been set.
pub const UNSET: f32 = -1.0;

const MAX_IOD_REDUCTION: f32 = 2.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WhichEye {
    Left,
    Right,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeParams {
    /// Offset from the nominal eye position, in pixels.
    pub center_x: f32,
    pub center_y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub angle_deg: f32,
    /// Fraction of the eye height covered from the top.
    pub upper_lid_y: f32,
    pub upper_lid_angle_deg: f32,
    pub upper_lid_bend: f32,
    /// Fraction of the eye height covered from the bottom.
    pub lower_lid_y: f32,
    pub lower_lid_angle_deg: f32,
    pub lower_lid_bend: f32,
    pub saturation: f32,
    pub lightness: f32,
    pub glow_size: f32,
}

impl Default for EyeParams {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            angle_deg: 0.0,
            upper_lid_y: 0.0,
            upper_lid_angle_deg: 0.0,
            upper_lid_bend: 0.0,
            lower_lid_y: 0.0,
            lower_lid_angle_deg: 0.0,
            lower_lid_bend: 0.0,
            saturation: UNSET,
            lightness: UNSET,
            glow_size: UNSET,
        }
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn blend_angle_deg(a: f32, b: f32, t: f32) -> f32 {
    let (ar, br) = (a.to_radians(), b.to_radians());
    let x = lerp(ar.cos(), br.cos(), t);
    let y = lerp(ar.sin(), br.sin(), t);
    y.atan2(x).to_degrees()
}

#[inline]
fn is_set(v: f32) -> bool {
    v >= 0.0
}

fn lerp_if_set(a: f32, b: f32, t: f32) -> f32 {
    match (is_set(a), is_set(b)) {
        (true, true) => lerp(a, b, t),
        (true, false) => a,
        _ => b,
    }
}

fn average_if_set(a: f32, b: f32, default: f32) -> f32 {
    match (is_set(a), is_set(b)) {
        (true, true) => 0.5 * (a + b),
        (true, false) => a,
        (false, true) => b,
        (false, false) => default,
    }
}

impl EyeParams {
    fn interpolate(a: &EyeParams, b: &EyeParams, t: f32) -> EyeParams {
        EyeParams {
            center_x: lerp(a.center_x, b.center_x, t),
            center_y: lerp(a.center_y, b.center_y, t),
            scale_x: lerp(a.scale_x, b.scale_x, t),
            scale_y: lerp(a.scale_y, b.scale_y, t),
            angle_deg: blend_angle_deg(a.angle_deg, b.angle_deg, t),
            upper_lid_y: lerp(a.upper_lid_y, b.upper_lid_y, t),
            upper_lid_angle_deg: lerp(a.upper_lid_angle_deg, b.upper_lid_angle_deg, t),
            upper_lid_bend: lerp(a.upper_lid_bend, b.upper_lid_bend, t),
            lower_lid_y: lerp(a.lower_lid_y, b.lower_lid_y, t),
            lower_lid_angle_deg: lerp(a.lower_lid_angle_deg, b.lower_lid_angle_deg, t),
            lower_lid_bend: lerp(a.lower_lid_bend, b.lower_lid_bend, t),
            saturation: lerp_if_set(a.saturation, b.saturation, t),
            lightness: lerp_if_set(a.lightness, b.lightness, t),
            glow_size: lerp_if_set(a.glow_size, b.glow_size, t),
        }
    }

    fn combine(&mut self, other: &EyeParams) {
        self.center_x += other.center_x;
        self.center_y += other.center_y;
        self.angle_deg += other.angle_deg;
        self.upper_lid_angle_deg += other.upper_lid_angle_deg;
        self.lower_lid_angle_deg += other.lower_lid_angle_deg;

        self.scale_x *= other.scale_x;
        self.scale_y *= other.scale_y;

        // the more closed lid wins
        self.upper_lid_y = self.upper_lid_y.max(other.upper_lid_y);
        self.lower_lid_y = self.lower_lid_y.max(other.lower_lid_y);

        self.saturation = average_if_set(self.saturation, other.saturation, DEFAULT_SATURATION);
        self.lightness = average_if_set(self.lightness, other.lightness, DEFAULT_LIGHTNESS);
        self.glow_size = average_if_set(self.glow_size, other.glow_size, DEFAULT_GLOW_SIZE);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProceduralFace {
    pub left_eye: EyeParams,
    pub right_eye: EyeParams,
    pub face_angle_deg: f32,
    /// Face translation in pixels.
    pub face_center: [f32; 2],
    pub face_scale: [f32; 2],
    pub scanline_opacity: f32,
    /// Peak horizontal row shift for glitch effects, in pixels.
    pub scanline_distortion_px: f32,
}

impl Default for ProceduralFace {
    fn default() -> Self {
        Self {
            left_eye: EyeParams::default(),
            right_eye: EyeParams::default(),
            face_angle_deg: 0.0,
            face_center: [0.0, 0.0],
            face_scale: [1.0, 1.0],
            scanline_opacity: DEFAULT_SCANLINE_OPACITY,
            scanline_distortion_px: 0.0,
        }
    }
}

impl ProceduralFace {
    #[inline]
    pub fn eye(&self, which: WhichEye) -> &EyeParams {
        match which {
            WhichEye::Left => &self.left_eye,
            WhichEye::Right => &self.right_eye,
        }
    }

    #[inline]
    pub fn eye_mut(&mut self, which: WhichEye) -> &mut EyeParams {
        match which {
            WhichEye::Left => &mut self.left_eye,
            WhichEye::Right => &mut self.right_eye,
        }
    }

    /// Apply the same edit to both eyes.
    pub fn set_both_eyes(&mut self, mut f: impl FnMut(&mut EyeParams)) {
        f(&mut self.left_eye);
        f(&mut self.right_eye);
    }

    /// `(xmin, xmax, ymin, ymax)` of the two eyes in screen pixels, ignoring the
    /// face translation.
    pub fn eye_bounding_box(&self) -> (f32, f32, f32, f32) {
        let (l, r) = (&self.left_eye, &self.right_eye);
        let [sx, sy] = self.face_scale;
        let left_half_w = l.scale_x * NOMINAL_EYE_WIDTH / 2.0;
        let right_half_w = r.scale_x * NOMINAL_EYE_WIDTH / 2.0;
        let xmin = NOMINAL_LEFT_EYE_X + sx * (l.center_x - left_half_w);
        let xmax = NOMINAL_RIGHT_EYE_X + sx * (r.center_x + right_half_w);

        let left_half_h = l.scale_y * NOMINAL_EYE_HEIGHT / 2.0;
        let right_half_h = r.scale_y * NOMINAL_EYE_HEIGHT / 2.0;
        let ymin = NOMINAL_EYE_Y
            + sy * (l.center_y - left_half_h).min(r.center_y - right_half_h);
        let ymax = NOMINAL_EYE_Y
            + sy * (l.center_y + left_half_h).max(r.center_y + right_half_h);
        (xmin, xmax, ymin, ymax)
    }

    /// Move the face, keeping the eyes on screen.
    pub fn set_face_position(&mut self, x: f32, y: f32) {
        let (xmin, xmax, ymin, ymax) = self.eye_bounding_box();
        self.face_center = [
            x.max(-xmin).min(FACE_WIDTH as f32 - xmax),
            y.max(-ymin).min(FACE_HEIGHT as f32 - ymax),
        ];
    }

    /// Shift the gaze by `(x, y)` pixels. The eye on the side being looked at
    /// grows, both eyes grow looking up and shrink looking down, and looking
    /// down pulls the eyes together.
    #[allow(clippy::too_many_arguments)]
    pub fn look_at(
        &mut self,
        x: f32,
        y: f32,
        xmax: f32,
        ymax: f32,
        look_up_max_scale: f32,
        look_down_min_scale: f32,
        outer_eye_scale_increase: f32,
    ) {
        self.set_face_position(x, y);

        let scale_lr = 1.0 + outer_eye_scale_increase * (x.abs() / xmax).min(1.0);
        let scale_ud = (look_up_max_scale - look_down_min_scale)
            * (1.0 - (y + ymax) / (2.0 * ymax)).min(1.0)
            + look_down_min_scale;

        let (left, right) = if x < 0.0 {
            (scale_lr * scale_ud, (2.0 - scale_lr) * scale_ud)
        } else {
            ((2.0 - scale_lr) * scale_ud, scale_lr * scale_ud)
        };
        self.left_eye.scale_y = left;
        self.right_eye.scale_y = right;
        debug_assert!(left > 0.0 && right > 0.0, "look_at produced a collapsed eye");

        let reduce_iod = if y > 0.0 {
            MAX_IOD_REDUCTION * (y / ymax).min(1.0)
        } else {
            0.0
        };
        self.left_eye.center_x = reduce_iod;
        self.right_eye.center_x = -reduce_iod;
    }

    /// Blend from `a` (fraction 0) to `b` (fraction 1).
    pub fn interpolate(a: &ProceduralFace, b: &ProceduralFace, fraction: f32) -> ProceduralFace {
        let t = fraction.clamp(0.0, 1.0);
        ProceduralFace {
            left_eye: EyeParams::interpolate(&a.left_eye, &b.left_eye, t),
            right_eye: EyeParams::interpolate(&a.right_eye, &b.right_eye, t),
            face_angle_deg: blend_angle_deg(a.face_angle_deg, b.face_angle_deg, t),
            face_center: [
                lerp(a.face_center[0], b.face_center[0], t),
                lerp(a.face_center[1], b.face_center[1], t),
            ],
            face_scale: [
                lerp(a.face_scale[0], b.face_scale[0], t),
                lerp(a.face_scale[1], b.face_scale[1], t),
            ],
            scanline_opacity: lerp(a.scanline_opacity, b.scanline_opacity, t),
            scanline_distortion_px: lerp(a.scanline_distortion_px, b.scanline_distortion_px, t),
        }
    }

    /// Layer `other` on top of this face.
    pub fn combine(&mut self, other: &ProceduralFace) -> &mut Self {
        self.left_eye.combine(&other.left_eye);
        self.right_eye.combine(&other.right_eye);

        self.face_angle_deg += other.face_angle_deg;
        self.face_scale[0] *= other.face_scale[0];
        self.face_scale[1] *= other.face_scale[1];
        self.face_center[0] += other.face_center[0];
        self.face_center[1] += other.face_center[1];

        let valid = |v: f32| (0.0..=1.0).contains(&v);
        self.scanline_opacity = match (valid(self.scanline_opacity), valid(other.scanline_opacity)) {
            (true, true) => 0.5 * (self.scanline_opacity + other.scanline_opacity),
            (true, false) => self.scanline_opacity,
            (false, true) => other.scanline_opacity,
            (false, false) => DEFAULT_SCANLINE_OPACITY,
        };

        if other.scanline_distortion_px.abs() > self.scanline_distortion_px.abs() {
            self.scanline_distortion_px = other.scanline_distortion_px;
        }
        self
    }

    /// `self` combined with `other`, leaving `self` untouched.
    pub fn combined(&self, other: &ProceduralFace) -> ProceduralFace {
        let mut out = self.clone();
        out.combine(other);
        out
    }
}
