//! Rasterize a [`ProceduralFace`] onto the face canvas.

use crate::bitmap::{FaceBitmap, FACE_HEIGHT, FACE_WIDTH};
use crate::procedural::{
    EyeParams, ProceduralFace, WhichEye, NOMINAL_EYE_HEIGHT, NOMINAL_EYE_WIDTH, NOMINAL_EYE_Y,
    NOMINAL_LEFT_EYE_X, NOMINAL_RIGHT_EYE_X,
};

/// Exponent of the superellipse used for the eye outline (rounded rectangle).
const EYE_SHAPE_EXPONENT: f32 = 4.0;

struct EyeGeometry {
    cx: f32,
    cy: f32,
    half_w: f32,
    half_h: f32,
    cos: f32,
    sin: f32,
    /// -1 for the right eye so lid angles mirror.
    mirror: f32,
}

fn eye_geometry(face: &ProceduralFace, which: WhichEye) -> EyeGeometry {
    let eye = face.eye(which);
    let [sx, sy] = face.face_scale;
    let nominal_x = match which {
        WhichEye::Left => NOMINAL_LEFT_EYE_X,
        WhichEye::Right => NOMINAL_RIGHT_EYE_X,
    };

    // eye center before the face rotation, then rotated about the screen center
    let ex = nominal_x + sx * eye.center_x;
    let ey = NOMINAL_EYE_Y + sy * eye.center_y;
    let (fcos, fsin) = (face.face_angle_deg.to_radians().cos(), face.face_angle_deg.to_radians().sin());
    let (ox, oy) = (FACE_WIDTH as f32 / 2.0, FACE_HEIGHT as f32 / 2.0);
    let (dx, dy) = (ex - ox, ey - oy);
    let cx = ox + dx * fcos - dy * fsin + face.face_center[0];
    let cy = oy + dx * fsin + dy * fcos + face.face_center[1];

    let angle = (eye.angle_deg + face.face_angle_deg).to_radians();
    EyeGeometry {
        cx,
        cy,
        half_w: (eye.scale_x * sx * NOMINAL_EYE_WIDTH / 2.0).abs(),
        half_h: (eye.scale_y * sy * NOMINAL_EYE_HEIGHT / 2.0).abs(),
        cos: angle.cos(),
        sin: angle.sin(),
        mirror: match which {
            WhichEye::Left => 1.0,
            WhichEye::Right => -1.0,
        },
    }
}

/// Is the eye-local point `(u, v)` covered by a lid?
fn under_lid(eye: &EyeParams, g: &EyeGeometry, u: f32, v: f32) -> bool {
    let un = if g.half_w > 0.0 { u / g.half_w } else { 0.0 };
    let curve = 1.0 - un * un;
    let mu = u * g.mirror;

    if eye.upper_lid_y > 0.0 {
        let edge = -g.half_h + 2.0 * g.half_h * eye.upper_lid_y
            + mu * eye.upper_lid_angle_deg.to_radians().tan()
            + eye.upper_lid_bend * g.half_h * curve;
        if v < edge {
            return true;
        }
    }
    if eye.lower_lid_y > 0.0 {
        let edge = g.half_h - 2.0 * g.half_h * eye.lower_lid_y
            + mu * eye.lower_lid_angle_deg.to_radians().tan()
            - eye.lower_lid_bend * g.half_h * curve;
        if v > edge {
            return true;
        }
    }
    false
}

fn draw_eye(face: &ProceduralFace, which: WhichEye, out: &mut FaceBitmap) {
    let g = eye_geometry(face, which);
    if g.half_w < 0.5 || g.half_h < 0.5 {
        return;
    }
    let eye = face.eye(which);
    let reach = g.half_w.max(g.half_h) + 1.0;
    let x0 = (g.cx - reach).floor().max(0.0) as usize;
    let x1 = ((g.cx + reach).ceil().max(0.0) as usize).min(FACE_WIDTH);
    let y0 = (g.cy - reach).floor().max(0.0) as usize;
    let y1 = ((g.cy + reach).ceil().max(0.0) as usize).min(FACE_HEIGHT);

    for y in y0..y1 {
        for x in x0..x1 {
            let (px, py) = (x as f32 + 0.5 - g.cx, y as f32 + 0.5 - g.cy);
            // into eye-local axes
            let u = px * g.cos + py * g.sin;
            let v = -px * g.sin + py * g.cos;
            let shape = (u.abs() / g.half_w).powf(EYE_SHAPE_EXPONENT)
                + (v.abs() / g.half_h).powf(EYE_SHAPE_EXPONENT);
            if shape <= 1.0 && !under_lid(eye, &g, u, v) {
                out.set(x, y, true);
            }
        }
    }
}

/// Row shift for a glitch: strongest across the middle rows, zero at the edges.
fn distortion_shift(distortion_px: f32, row: usize) -> i32 {
    let frac = row as f32 / (FACE_HEIGHT - 1) as f32;
    let weight = 1.0 - (2.0 * frac - 1.0).abs();
    (distortion_px * weight).round() as i32
}

/// Draw `face` as a bilevel frame.
pub fn render(face: &ProceduralFace) -> FaceBitmap {
    let mut out = FaceBitmap::blank();
    draw_eye(face, WhichEye::Left, &mut out);
    draw_eye(face, WhichEye::Right, &mut out);

    if face.scanline_distortion_px != 0.0 {
        for row in 0..FACE_HEIGHT {
            out.shift_row(row, distortion_shift(face.scanline_distortion_px, row));
        }
    }
    out.apply_scanlines(face.scanline_opacity);
    out
}
