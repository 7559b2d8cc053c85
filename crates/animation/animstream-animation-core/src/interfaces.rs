//! Collaborators the streamer talks to.
//!
//! Every call is synchronous and fire-and-forget from the streamer's point of
//! view; implementations must not block the tick.

use animstream_face_core::FaceBitmap;

use crate::animation::Animation;
use crate::keyframe::AudioRef;
use crate::messages::Message;

/// Outbound message channel to the robot and upstream listeners.
pub trait Transport {
    /// `false` when the message could not be delivered. The streamer logs and
    /// drops it; normal ticking supersedes it.
    fn send(&mut self, msg: &Message) -> bool;
}

/// Face display.
pub trait DisplaySink {
    fn draw_frame(&mut self, frame: &FaceBitmap);
}

/// Thin client of the audio engine.
pub trait AudioClient {
    fn play(&mut self, audio: &AudioRef);
    fn stop_all(&mut self);
    /// Whether any animation-sourced sound is still playing.
    fn has_active_events(&self) -> bool;
    fn tick(&mut self) {}
}

/// Source of named animations.
pub trait AnimationLoader {
    fn get_animation(&self, name: &str) -> Option<&Animation>;
}
