//! Identifiers: session tags and procedural layer tags.

use serde::{Deserialize, Serialize};

/// Correlation tag threaded through start/end/event notifications.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Tag(pub u32);

impl Tag {
    /// Tag used for internal sessions (neutral face, procedural faces).
    pub const NOT_ANIMATING: Tag = Tag(0);
}

/// Handle to a procedural layer, returned when the layer is added.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerTag(pub u32);

/// Monotonic allocator for LayerTag. Zero is never handed out.
#[derive(Clone, Default, Debug)]
pub struct TagAllocator {
    next_layer: u32,
}

impl TagAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_layer(&mut self) -> LayerTag {
        self.next_layer = self.next_layer.wrapping_add(1).max(1);
        LayerTag(self.next_layer)
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
