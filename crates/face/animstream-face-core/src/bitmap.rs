//! Fixed-size monochrome face canvas.
//!
//! The display is a 1 bit/pixel canvas of `FACE_WIDTH x FACE_HEIGHT`. Pixels are
//! stored row-major as booleans; the codec works on the column-packed form where
//! each column is one `u64` with bit `row` set when the pixel is lit.

use serde::{Deserialize, Serialize};

use crate::error::FaceError;

pub const FACE_WIDTH: usize = 128;
pub const FACE_HEIGHT: usize = 64;

/// Luma value above which a source pixel counts as lit.
pub const DEFAULT_THRESHOLD: u8 = 128;

/// Column-packed form of a face bitmap.
pub type PackedColumns = [u64; FACE_WIDTH];

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceBitmap {
    pixels: Vec<bool>,
}

impl Default for FaceBitmap {
    fn default() -> Self {
        Self::blank()
    }
}

impl std::fmt::Debug for FaceBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaceBitmap")
            .field("lit", &self.lit_count())
            .finish()
    }
}

impl FaceBitmap {
    /// All pixels off.
    pub fn blank() -> Self {
        Self {
            pixels: vec![false; FACE_WIDTH * FACE_HEIGHT],
        }
    }

    /// Threshold an 8-bit grayscale buffer (row-major) into a face bitmap.
    ///
    /// A pixel is lit when its value is strictly greater than `threshold`.
    pub fn from_luma(
        width: usize,
        height: usize,
        pixels: &[u8],
        threshold: u8,
    ) -> Result<Self, FaceError> {
        if width != FACE_WIDTH || height != FACE_HEIGHT {
            return Err(FaceError::DimensionMismatch {
                width,
                height,
                expected_width: FACE_WIDTH,
                expected_height: FACE_HEIGHT,
            });
        }
        if pixels.len() != width * height {
            return Err(FaceError::BufferSize {
                actual: pixels.len(),
                expected: width * height,
            });
        }
        Ok(Self {
            pixels: pixels.iter().map(|&p| p > threshold).collect(),
        })
    }

    /// Build from a closure evaluated for every `(x, y)`.
    pub fn from_fn(mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut bmp = Self::blank();
        for y in 0..FACE_HEIGHT {
            for x in 0..FACE_WIDTH {
                bmp.pixels[y * FACE_WIDTH + x] = f(x, y);
            }
        }
        bmp
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        x < FACE_WIDTH && y < FACE_HEIGHT && self.pixels[y * FACE_WIDTH + x]
    }

    /// Out-of-canvas writes are ignored.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        if x < FACE_WIDTH && y < FACE_HEIGHT {
            self.pixels[y * FACE_WIDTH + x] = on;
        }
    }

    #[inline]
    pub fn is_blank(&self) -> bool {
        !self.pixels.iter().any(|&p| p)
    }

    pub fn lit_count(&self) -> usize {
        self.pixels.iter().filter(|&&p| p).count()
    }

    pub fn to_columns(&self) -> PackedColumns {
        let mut cols = [0u64; FACE_WIDTH];
        for (x, col) in cols.iter_mut().enumerate() {
            for y in 0..FACE_HEIGHT {
                if self.pixels[y * FACE_WIDTH + x] {
                    *col |= 1u64 << y;
                }
            }
        }
        cols
    }

    pub fn from_columns(cols: &PackedColumns) -> Self {
        Self::from_fn(|x, y| (cols[x] >> y) & 1 == 1)
    }

    /// Dim alternate rows. The panel is bilevel, so anything under half opacity
    /// blanks the odd rows entirely.
    pub fn apply_scanlines(&mut self, opacity: f32) {
        if opacity >= 0.5 {
            return;
        }
        for y in (1..FACE_HEIGHT).step_by(2) {
            for x in 0..FACE_WIDTH {
                self.pixels[y * FACE_WIDTH + x] = false;
            }
        }
    }

    /// Shift row `y` horizontally by `dx` pixels, filling with off pixels.
    pub fn shift_row(&mut self, y: usize, dx: i32) {
        if y >= FACE_HEIGHT || dx == 0 {
            return;
        }
        let row = &mut self.pixels[y * FACE_WIDTH..(y + 1) * FACE_WIDTH];
        let n = dx.unsigned_abs() as usize;
        if n >= FACE_WIDTH {
            row.iter_mut().for_each(|p| *p = false);
        } else if dx > 0 {
            row.rotate_right(n);
            row[..n].iter_mut().for_each(|p| *p = false);
        } else {
            row.rotate_left(n);
            row[FACE_WIDTH - n..].iter_mut().for_each(|p| *p = false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_strict() {
        let mut luma = vec![0u8; FACE_WIDTH * FACE_HEIGHT];
        luma[0] = 128;
        luma[1] = 129;
        let bmp = FaceBitmap::from_luma(FACE_WIDTH, FACE_HEIGHT, &luma, DEFAULT_THRESHOLD).unwrap();
        assert!(!bmp.get(0, 0));
        assert!(bmp.get(1, 0));
        assert_eq!(bmp.lit_count(), 1);
    }

    #[test]
    fn wrong_dimensions_rejected() {
        let luma = vec![255u8; 64 * 64];
        let err = FaceBitmap::from_luma(64, 64, &luma, DEFAULT_THRESHOLD).unwrap_err();
        assert!(matches!(err, FaceError::DimensionMismatch { width: 64, .. }));
    }

    #[test]
    fn column_packing_matches_pixels() {
        let mut bmp = FaceBitmap::blank();
        bmp.set(3, 0, true);
        bmp.set(3, 63, true);
        let cols = bmp.to_columns();
        assert_eq!(cols[3], 1 | (1u64 << 63));
        assert_eq!(FaceBitmap::from_columns(&cols), bmp);
    }

    #[test]
    fn scanlines_clear_odd_rows_when_dim() {
        let mut bmp = FaceBitmap::from_fn(|_, _| true);
        bmp.apply_scanlines(0.7);
        assert_eq!(bmp.lit_count(), FACE_WIDTH * FACE_HEIGHT);
        bmp.apply_scanlines(0.2);
        assert_eq!(bmp.lit_count(), FACE_WIDTH * FACE_HEIGHT / 2);
        assert!(bmp.get(0, 0));
        assert!(!bmp.get(0, 1));
    }

    #[test]
    fn shift_row_moves_and_fills() {
        let mut bmp = FaceBitmap::blank();
        bmp.set(0, 5, true);
        bmp.shift_row(5, 3);
        assert!(bmp.get(3, 5));
        assert!(!bmp.get(0, 5));
        bmp.shift_row(5, -4);
        assert_eq!(bmp.lit_count(), 0);
    }
}
