//! Single-channel keyframe sequence with a forward-only cursor.

use std::collections::VecDeque;

use crate::error::StreamError;
use crate::keyframe::KeyFrameKind;

/// Keyframes of one channel, ordered by non-decreasing trigger time.
///
/// A live track (used by the runtime-built procedural animation) drops each
/// keyframe once the cursor moves past it, so it can be appended to forever.
#[derive(Clone, Debug)]
pub struct Track<K> {
    frames: VecDeque<K>,
    cursor: usize,
    is_live: bool,
}

impl<K> Default for Track<K> {
    fn default() -> Self {
        Self {
            frames: VecDeque::new(),
            cursor: 0,
            is_live: false,
        }
    }
}

impl<K: KeyFrameKind> Track<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a keyframe; triggers may repeat but never go backwards.
    pub fn add_keyframe(&mut self, keyframe: K) -> Result<(), StreamError> {
        if let Some(last) = self.frames.back() {
            if keyframe.trigger_time_ms() < last.trigger_time_ms() {
                return Err(StreamError::InvalidKeyFrame {
                    track: K::TRACK_NAME.to_string(),
                    reason: format!(
                        "trigger {}ms precedes last trigger {}ms",
                        keyframe.trigger_time_ms(),
                        last.trigger_time_ms()
                    ),
                });
            }
        }
        self.frames.push_back(keyframe);
        Ok(())
    }

    #[inline]
    pub fn move_to_start(&mut self) {
        self.cursor = 0;
    }

    #[inline]
    pub fn current(&self) -> Option<&K> {
        self.frames.get(self.cursor)
    }

    #[inline]
    pub fn current_mut(&mut self) -> Option<&mut K> {
        self.frames.get_mut(self.cursor)
    }

    /// Keyframe after the current one.
    #[inline]
    pub fn peek_next(&self) -> Option<&K> {
        self.frames.get(self.cursor + 1)
    }

    /// Current and next keyframe together, the current one mutable.
    pub fn current_and_next(&mut self) -> (Option<&mut K>, Option<&K>) {
        let (head, tail) = self.frames.as_mut_slices();
        let mut iter = head.iter_mut().chain(tail.iter_mut()).skip(self.cursor);
        let cur = iter.next();
        let next = iter.next().map(|k| &*k);
        (cur, next)
    }

    #[inline]
    pub fn has_frames_left(&self) -> bool {
        self.cursor < self.frames.len()
    }

    /// Move past the current keyframe.
    pub fn advance(&mut self) {
        if !self.has_frames_left() {
            return;
        }
        if self.is_live {
            self.frames.pop_front();
        } else {
            self.cursor += 1;
        }
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.cursor = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.is_live
    }

    pub fn set_is_live(&mut self, is_live: bool) {
        self.is_live = is_live;
    }

    pub fn last_keyframe(&self) -> Option<&K> {
        self.frames.back()
    }

    pub fn last_trigger_time_ms(&self) -> u32 {
        self.frames.back().map_or(0, K::trigger_time_ms)
    }

    pub fn last_end_time_ms(&self) -> u32 {
        self.frames.back().map_or(0, K::end_time_ms)
    }

    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.frames.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut K> {
        self.frames.iter_mut()
    }
}
