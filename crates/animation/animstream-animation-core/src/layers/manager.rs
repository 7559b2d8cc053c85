//! Generic ordered layer stack over one keyframe kind.

use std::collections::BTreeMap;

use crate::error::StreamError;
use crate::ids::{LayerTag, TagAllocator};
use crate::keyframe::{BackpackLightsKeyFrame, KeyFrameKind, RobotAudioKeyFrame};
use crate::track::Track;

/// One supplemental track with its own clock.
#[derive(Clone, Debug)]
pub struct Layer<K> {
    pub tag: LayerTag,
    pub name: String,
    pub track: Track<K>,
    /// Bound the first time the layer is applied.
    pub start_time_ms: Option<u32>,
    /// Persistent layers hold their last keyframe until explicitly removed.
    pub persistent: bool,
}

impl<K: KeyFrameKind> Layer<K> {
    /// Time since the layer started; zero before its first application.
    #[inline]
    pub fn layer_time_ms(&self, now_ms: u32) -> u32 {
        self.start_time_ms
            .map_or(0, |start| now_ms.saturating_sub(start))
    }

    fn is_finished(&self, now_ms: u32) -> bool {
        if self.track.is_empty() {
            return true;
        }
        if self.persistent || self.start_time_ms.is_none() {
            return false;
        }
        self.layer_time_ms(now_ms) >= self.track.last_end_time_ms()
    }
}

/// Layers ordered by tag, i.e. by insertion.
#[derive(Clone, Debug)]
pub struct LayerManager<K> {
    layers: BTreeMap<LayerTag, Layer<K>>,
    tags: TagAllocator,
}

impl<K> Default for LayerManager<K> {
    fn default() -> Self {
        Self {
            layers: BTreeMap::new(),
            tags: TagAllocator::new(),
        }
    }
}

impl<K: KeyFrameKind> LayerManager<K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, name: &str, mut track: Track<K>, persistent: bool) -> LayerTag {
        let tag = self.tags.alloc_layer();
        track.set_is_live(true);
        track.move_to_start();
        log::debug!(
            "LayerManager.AddLayer: {} layer '{name}' ({} keyframes) tag {}",
            K::TRACK_NAME,
            track.len(),
            tag.0
        );
        self.layers.insert(
            tag,
            Layer {
                tag,
                name: name.to_string(),
                track,
                start_time_ms: None,
                persistent,
            },
        );
        tag
    }

    /// Layer removed once its last keyframe has played out.
    pub fn add_layer(&mut self, name: &str, track: Track<K>) -> LayerTag {
        self.insert(name, track, false)
    }

    /// Layer that holds its last keyframe until removed.
    pub fn add_persistent_layer(&mut self, name: &str, track: Track<K>) -> LayerTag {
        self.insert(name, track, true)
    }

    /// Append keyframes to a persistent layer. Their triggers are taken as
    /// relative to the layer's current time.
    pub fn add_to_persistent_layer(
        &mut self,
        tag: LayerTag,
        keyframes: impl IntoIterator<Item = K>,
        now_ms: u32,
    ) -> Result<(), StreamError> {
        let layer = self.persistent_layer_mut(tag)?;
        let elapsed = layer.layer_time_ms(now_ms);
        for mut kf in keyframes {
            let trigger = (elapsed + kf.trigger_time_ms()).max(layer.track.last_trigger_time_ms());
            kf.set_trigger_time_ms(trigger);
            layer.track.add_keyframe(kf)?;
        }
        Ok(())
    }

    /// Blend a persistent layer out: `neutral` is appended `duration_ms` after
    /// the layer's current time and the layer becomes removable.
    pub fn remove_persistent_layer(
        &mut self,
        tag: LayerTag,
        duration_ms: u32,
        mut neutral: K,
        now_ms: u32,
    ) -> Result<(), StreamError> {
        let layer = self.persistent_layer_mut(tag)?;
        let at = layer
            .layer_time_ms(now_ms)
            .max(layer.track.last_trigger_time_ms())
            + duration_ms;
        neutral.set_trigger_time_ms(at);
        layer.track.add_keyframe(neutral)?;
        layer.persistent = false;
        log::debug!(
            "LayerManager.RemovePersistentLayer: '{}' fades out over {duration_ms}ms",
            layer.name
        );
        Ok(())
    }

    fn persistent_layer_mut(&mut self, tag: LayerTag) -> Result<&mut Layer<K>, StreamError> {
        match self.layers.get_mut(&tag) {
            Some(layer) if layer.persistent => Ok(layer),
            _ => Err(StreamError::InvalidKeyFrame {
                track: K::TRACK_NAME.to_string(),
                reason: format!("no persistent layer with tag {}", tag.0),
            }),
        }
    }

    pub fn remove_layer(&mut self, tag: LayerTag) -> bool {
        self.layers.remove(&tag).is_some()
    }

    #[inline]
    pub fn has_layer(&self, tag: LayerTag) -> bool {
        self.layers.contains_key(&tag)
    }

    pub fn has_layer_named(&self, name: &str) -> bool {
        self.layers.values().any(|l| l.name == name)
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn has_layers(&self) -> bool {
        !self.layers.is_empty()
    }

    pub fn get(&self, tag: LayerTag) -> Option<&Layer<K>> {
        self.layers.get(&tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer<K>> {
        self.layers.values()
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    /// Bind start times and move every cursor to the keyframe active at
    /// `now_ms`.
    pub(crate) fn seek(&mut self, now_ms: u32) {
        for layer in self.layers.values_mut() {
            let start = *layer.start_time_ms.get_or_insert(now_ms);
            let t = now_ms.saturating_sub(start);
            while layer
                .track
                .peek_next()
                .is_some_and(|next| next.is_time_to_play(t))
            {
                layer.track.advance();
            }
        }
    }

    /// Drop layers that have finished.
    pub fn update(&mut self, now_ms: u32) {
        self.layers.retain(|_, layer| {
            let done = layer.is_finished(now_ms);
            if done {
                log::debug!("LayerManager.Update: layer '{}' finished", layer.name);
            }
            !done
        });
    }
}

impl LayerManager<BackpackLightsKeyFrame> {
    /// Lights of the newest layer with a due keyframe.
    pub fn due_lights(&mut self, now_ms: u32) -> Option<BackpackLightsKeyFrame> {
        self.seek(now_ms);
        self.layers.values().rev().find_map(|layer| {
            let t = layer.layer_time_ms(now_ms);
            layer
                .track
                .current()
                .filter(|kf| kf.is_time_to_play(t))
                .cloned()
        })
    }
}

impl LayerManager<RobotAudioKeyFrame> {
    /// The first due audio keyframe, consumed.
    pub fn take_due_audio(&mut self, now_ms: u32) -> Option<RobotAudioKeyFrame> {
        for layer in self.layers.values_mut() {
            let start = *layer.start_time_ms.get_or_insert(now_ms);
            let t = now_ms.saturating_sub(start);
            let due = layer
                .track
                .current()
                .filter(|kf| kf.is_time_to_play(t))
                .cloned();
            if due.is_some() {
                layer.track.advance();
                return due;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::AudioRef;
    use crate::messages::{BackpackLights, Rgb};

    fn lights(r: f32, trigger: u32, duration: u32) -> BackpackLightsKeyFrame {
        BackpackLightsKeyFrame::new(
            trigger,
            BackpackLights {
                zones: [Rgb::new(r, 0.0, 0.0); 5],
            },
            duration,
        )
    }

    fn track<K: KeyFrameKind>(frames: impl IntoIterator<Item = K>) -> Track<K> {
        let mut t = Track::new();
        for kf in frames {
            t.add_keyframe(kf).unwrap();
        }
        t
    }

    #[test]
    fn layer_starts_on_first_application_and_expires() {
        let mut mgr = LayerManager::new();
        mgr.add_layer("flash", track([lights(1.0, 0, 100)]));
        // applied first at 1000; lasts 100ms from there
        assert!(mgr.due_lights(1000).is_some());
        mgr.update(1066);
        assert!(mgr.has_layers());
        mgr.update(1100);
        assert!(!mgr.has_layers());
    }

    #[test]
    fn newest_layer_wins() {
        let mut mgr = LayerManager::new();
        mgr.add_layer("a", track([lights(0.2, 0, 500)]));
        mgr.add_layer("b", track([lights(0.9, 0, 500)]));
        let kf = mgr.due_lights(0).unwrap();
        assert_eq!(kf.lights.zones[0].r, 0.9);
    }

    #[test]
    fn persistent_layer_holds_until_removed() {
        let mut mgr = LayerManager::new();
        let tag = mgr.add_persistent_layer("hold", track([lights(1.0, 0, 0)]));
        mgr.due_lights(0);
        mgr.update(10_000);
        assert!(mgr.has_layer(tag));

        mgr.add_to_persistent_layer(tag, [lights(0.5, 100, 0)], 10_000)
            .unwrap();
        assert_eq!(mgr.get(tag).unwrap().track.last_trigger_time_ms(), 10_100);

        mgr.remove_persistent_layer(tag, 200, lights(0.0, 0, 0), 10_000)
            .unwrap();
        assert!(!mgr.get(tag).unwrap().persistent);
        mgr.due_lights(10_300);
        mgr.update(10_300);
        assert!(!mgr.has_layer(tag));
        assert!(mgr.remove_persistent_layer(tag, 0, lights(0.0, 0, 0), 0).is_err());
    }

    #[test]
    fn audio_layers_emit_once() {
        let mut mgr = LayerManager::new();
        mgr.add_layer(
            "chirp",
            track([RobotAudioKeyFrame::new(0, vec![AudioRef::new("chirp")])]),
        );
        assert!(mgr.take_due_audio(50).is_some());
        assert!(mgr.take_due_audio(83).is_none());
        mgr.update(83);
        assert!(!mgr.has_layers());
    }

    #[test]
    fn cloned_manager_allocates_independently() {
        let mut mgr = LayerManager::new();
        let first = mgr.add_layer("a", track([lights(0.2, 0, 500)]));
        let mut copy = mgr.clone();
        let next = mgr.add_layer("b", track([lights(0.4, 0, 500)]));
        assert_eq!(copy.add_layer("c", track([lights(0.6, 0, 500)])), next);
        assert!(copy.has_layer(first));
        assert_eq!(copy.num_layers(), 2);
    }
}
