//! Error types for the streaming engine and animation data.

use serde::{Deserialize, Serialize};

/// Recoverable failures surfaced by the streamer and loaders.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum StreamError {
    /// Another animation is streaming and interruption was not requested.
    #[error("Streamer busy with '{current}', cannot start '{requested}'")]
    Busy { current: String, requested: String },

    /// An animation was streamed without being initialized first.
    #[error("Animation '{name}' was not initialized before streaming")]
    NotInitialized { name: String },

    /// No animation with this name is known to the loader.
    #[error("Animation not found: {name}")]
    UnknownAnimation { name: String },

    /// A required default asset is absent.
    #[error("Missing required asset: {name}")]
    MissingAsset { name: String },

    /// Keyframe rejected by a track (ordering or payload).
    #[error("Invalid keyframe in track {track}: {reason}")]
    InvalidKeyFrame { track: String, reason: String },

    /// JSON input could not be parsed.
    #[error("Parse error: {reason}")]
    Parse { reason: String },
}
