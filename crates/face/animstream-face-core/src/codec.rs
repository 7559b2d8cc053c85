//! Run-length codec for face frames.
//!
//! Frames are encoded column by column (64-row columns, bit `row` of a column
//! set when lit). Opcodes:
//!
//! - `00xxxxxx`: `x+1` empty columns
//! - `01xxxxxx`: `x+1` copies of the previous column
//! - `1xxxxxyy`: `x+1` two-row chunks holding pattern `yy`, filling the current
//!   column from row 0
//!
//! A column's trailing all-zero chunk run is left out when the next column is
//! encoded as clear/repeat (or there is no next column); the decoder finalizes a
//! partial column before any clear/repeat opcode. Anything that would encode to
//! `MAX_FACE_FRAME_SIZE` bytes or more is stored as the raw packed columns
//! instead, which the decoder recognises by its exact length.

use serde::{Deserialize, Serialize};

use crate::bitmap::{FaceBitmap, PackedColumns, FACE_HEIGHT, FACE_WIDTH};
use crate::error::FaceError;

/// Size of the raw packed form, and the upper bound of any encoded frame.
pub const MAX_FACE_FRAME_SIZE: usize = FACE_WIDTH * (FACE_HEIGHT / 8);

const MAX_COLUMN_RUN: usize = 64;
const MAX_CHUNK_RUN: usize = 32;

const OP_REPEAT: u8 = 0x40;
const OP_PATTERN: u8 = 0x80;

/// An encoded face frame.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RleFrame {
    bytes: Vec<u8>,
}

impl std::fmt::Debug for RleFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RleFrame")
            .field("len", &self.bytes.len())
            .field("raw", &self.is_raw())
            .finish()
    }
}

impl RleFrame {
    /// Wrap bytes received from elsewhere; validity is checked on decode.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True when the frame holds the uncompressed fallback.
    #[inline]
    pub fn is_raw(&self) -> bool {
        self.bytes.len() == MAX_FACE_FRAME_SIZE
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn decode(&self) -> FaceBitmap {
        decode(&self.bytes)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ColumnOp {
    Clear,
    Repeat,
    Pattern,
}

#[inline]
fn column_op(cols: &PackedColumns, x: usize) -> ColumnOp {
    if cols[x] == 0 {
        ColumnOp::Clear
    } else if x > 0 && cols[x] == cols[x - 1] {
        ColumnOp::Repeat
    } else {
        ColumnOp::Pattern
    }
}

/// Length of the run of columns starting at `x` that satisfy `same`.
fn column_run(x: usize, same: impl Fn(usize) -> bool) -> usize {
    let mut count = 1;
    while x + count < FACE_WIDTH && count < MAX_COLUMN_RUN && same(x + count) {
        count += 1;
    }
    count
}

fn encode_pattern_column(col: u64, elide_trailing_zero: bool, out: &mut Vec<u8>) {
    let mut runs: Vec<(u8, usize)> = Vec::with_capacity(FACE_HEIGHT / 2);
    for row in (0..FACE_HEIGHT).step_by(2) {
        let pattern = ((col >> row) & 0b11) as u8;
        match runs.last_mut() {
            Some((p, count)) if *p == pattern && *count < MAX_CHUNK_RUN => *count += 1,
            _ => runs.push((pattern, 1)),
        }
    }
    if elide_trailing_zero && matches!(runs.last(), Some((0, _))) {
        runs.pop();
    }
    for (pattern, count) in runs {
        out.push(OP_PATTERN | (((count - 1) as u8) << 2) | pattern);
    }
}

/// Encode a face bitmap. Never returns more than `MAX_FACE_FRAME_SIZE` bytes.
pub fn encode(bitmap: &FaceBitmap) -> RleFrame {
    let cols = bitmap.to_columns();
    let mut out = Vec::with_capacity(64);
    let mut x = 0;
    while x < FACE_WIDTH {
        match column_op(&cols, x) {
            ColumnOp::Clear => {
                let count = column_run(x, |i| cols[i] == 0);
                out.push((count - 1) as u8);
                x += count;
            }
            ColumnOp::Repeat => {
                let count = column_run(x, |i| cols[i] == cols[x]);
                out.push(OP_REPEAT | (count - 1) as u8);
                x += count;
            }
            ColumnOp::Pattern => {
                let elide = x + 1 == FACE_WIDTH || column_op(&cols, x + 1) != ColumnOp::Pattern;
                encode_pattern_column(cols[x], elide, &mut out);
                x += 1;
            }
        }
        if out.len() >= MAX_FACE_FRAME_SIZE {
            break;
        }
    }

    if out.len() >= MAX_FACE_FRAME_SIZE {
        return RleFrame {
            bytes: encode_raw(&cols),
        };
    }
    RleFrame { bytes: out }
}

fn encode_raw(cols: &PackedColumns) -> Vec<u8> {
    cols.iter().flat_map(|c| c.to_le_bytes()).collect()
}

/// Threshold an 8-bit grayscale image and encode it. Fails without output when
/// the image is not face-sized.
pub fn compress_luma(
    width: usize,
    height: usize,
    pixels: &[u8],
    threshold: u8,
) -> Result<RleFrame, FaceError> {
    let bitmap = FaceBitmap::from_luma(width, height, pixels, threshold)?;
    Ok(encode(&bitmap))
}

/// Strict decode.
pub fn try_decode(bytes: &[u8]) -> Result<FaceBitmap, FaceError> {
    if bytes.len() == MAX_FACE_FRAME_SIZE {
        let mut cols = [0u64; FACE_WIDTH];
        for (col, chunk) in cols.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            *col = u64::from_le_bytes(word);
        }
        return Ok(FaceBitmap::from_columns(&cols));
    }
    if bytes.len() > MAX_FACE_FRAME_SIZE {
        return Err(FaceError::corrupt(format!(
            "{} bytes exceeds the {} byte frame limit",
            bytes.len(),
            MAX_FACE_FRAME_SIZE
        )));
    }

    let mut cols = [0u64; FACE_WIDTH];
    let mut x = 0usize;
    let mut row = 0usize;
    for (i, &op) in bytes.iter().enumerate() {
        if op & OP_PATTERN != 0 {
            let count = ((op >> 2) & 0x1F) as usize + 1;
            let pattern = (op & 0b11) as u64;
            for _ in 0..count {
                if x >= FACE_WIDTH {
                    return Err(FaceError::corrupt(format!(
                        "pattern run past the last column at byte {i}"
                    )));
                }
                cols[x] |= pattern << row;
                row += 2;
                if row >= FACE_HEIGHT {
                    row = 0;
                    x += 1;
                }
            }
            continue;
        }

        if row > 0 {
            row = 0;
            x += 1;
        }
        let count = (op & 0x3F) as usize + 1;
        if x + count > FACE_WIDTH {
            return Err(FaceError::corrupt(format!(
                "column run of {count} at column {x} overflows the frame (byte {i})"
            )));
        }
        if op & OP_REPEAT != 0 {
            if x == 0 {
                return Err(FaceError::corrupt("repeat run with no previous column"));
            }
            for _ in 0..count {
                cols[x] = cols[x - 1];
                x += 1;
            }
        } else {
            x += count;
        }
    }
    if row > 0 {
        x += 1;
    }
    if x != FACE_WIDTH {
        return Err(FaceError::corrupt(format!(
            "frame covers {x} of {FACE_WIDTH} columns"
        )));
    }
    Ok(FaceBitmap::from_columns(&cols))
}

/// Lenient decode: corrupt input yields a blank frame.
pub fn decode(bytes: &[u8]) -> FaceBitmap {
    match try_decode(bytes) {
        Ok(bitmap) => bitmap,
        Err(e) => {
            log::warn!("FaceCodec.Decode: {e}; showing blank frame");
            FaceBitmap::blank()
        }
    }
}
