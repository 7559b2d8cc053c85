//! Error types for face bitmaps, the frame codec and the face asset store.

use std::path::PathBuf;

/// Errors raised while building, encoding, decoding or loading face frames.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum FaceError {
    /// Source image does not match the fixed face canvas.
    #[error("Face image is {width}x{height}, expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        width: usize,
        height: usize,
        expected_width: usize,
        expected_height: usize,
    },

    /// Pixel buffer length does not agree with the stated dimensions.
    #[error("Pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize { actual: usize, expected: usize },

    /// Encoded frame could not be decoded.
    #[error("Corrupt face frame: {reason}")]
    CorruptFrame { reason: String },

    /// A directory tried to claim the reserved procedural entry.
    #[error("Face animation name '{name}' is reserved")]
    ReservedName { name: String },

    /// Filesystem error while scanning face assets.
    #[error("IO error at {path:?}: {reason}")]
    Io { path: PathBuf, reason: String },

    /// Image file could not be decoded.
    #[error("Failed to load image {path:?}: {reason}")]
    Image { path: PathBuf, reason: String },
}

impl FaceError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        FaceError::CorruptFrame {
            reason: reason.into(),
        }
    }
}
