//! animstream face core
//!
//! Monochrome face frames for the robot display: the fixed-size bitmap, the
//! run-length frame codec, the named face asset store, and parametric
//! (procedural) faces with their rasterizer.

pub mod bitmap;
pub mod codec;
pub mod error;
pub mod procedural;
pub mod render;
pub mod store;

pub use bitmap::{FaceBitmap, DEFAULT_THRESHOLD, FACE_HEIGHT, FACE_WIDTH};
pub use codec::{compress_luma, decode, encode, try_decode, RleFrame, MAX_FACE_FRAME_SIZE};
pub use error::FaceError;
pub use procedural::{EyeParams, ProceduralFace, WhichEye};
pub use render::render;
pub use store::{FaceAssetStore, MAX_FRAME_NUMBER, PROCEDURAL_ANIMATION_NAME};
