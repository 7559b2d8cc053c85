//! Per-track bit flags used for locking and in-use bookkeeping.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// One bit per animation channel.
    ///
    /// Heading tracks share `BODY`; raw face images and face-asset animations
    /// share `FACE_IMAGE`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TrackFlags: u8 {
        const HEAD = 0b0000_0001;
        const LIFT = 0b0000_0010;
        const BODY = 0b0000_0100;
        const FACE_IMAGE = 0b0000_1000;
        const PROCEDURAL_FACE = 0b0001_0000;
        const BACKPACK_LIGHTS = 0b0010_0000;
        const AUDIO = 0b0100_0000;
        const EVENT = 0b1000_0000;
    }
}

impl TrackFlags {
    /// Tracks whose motion must be explicitly stopped when a session ends.
    pub const STOPPABLE: TrackFlags = TrackFlags::HEAD
        .union(TrackFlags::LIFT)
        .union(TrackFlags::BODY)
        .union(TrackFlags::BACKPACK_LIGHTS);
}
