#![allow(dead_code)]

use animstream_animation_core::face::{FaceAssetStore, FaceBitmap};
use animstream_animation_core::{
    AnimationLibrary, AnimationStreamer, AudioClient, AudioRef, Config, DisplaySink, Message,
    Transport,
};

#[derive(Debug)]
pub struct RecordingTransport {
    pub sent: Vec<Message>,
    pub accept: bool,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self {
            sent: Vec::new(),
            accept: true,
        }
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, msg: &Message) -> bool {
        self.sent.push(msg.clone());
        self.accept
    }
}

#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub frames: Vec<FaceBitmap>,
}

impl DisplaySink for RecordingDisplay {
    fn draw_frame(&mut self, frame: &FaceBitmap) {
        self.frames.push(frame.clone());
    }
}

#[derive(Debug, Default)]
pub struct RecordingAudio {
    pub played: Vec<String>,
    pub stop_calls: usize,
    /// Reported by `has_active_events`.
    pub active: bool,
}

impl AudioClient for RecordingAudio {
    fn play(&mut self, audio: &AudioRef) {
        self.played.push(audio.event_id.clone());
    }

    fn stop_all(&mut self) {
        self.stop_calls += 1;
    }

    fn has_active_events(&self) -> bool {
        self.active
    }
}

pub type TestStreamer = AnimationStreamer<RecordingTransport, RecordingDisplay, RecordingAudio>;

/// Every animation fixture in one library.
pub fn library() -> AnimationLibrary {
    let mut lib = AnimationLibrary::new();
    for key in animstream_test_fixtures::animations::keys() {
        let json = animstream_test_fixtures::animations::json(&key).expect("load animation fixture");
        lib.load_json(&json).expect("parse animation fixture");
    }
    lib
}

/// Deterministic config with keep-alive off.
pub fn test_config() -> Config {
    Config {
        random_seed: Some(11),
        enable_keep_face_alive: false,
        ..Config::default()
    }
}

pub fn streamer_with(config: Config) -> TestStreamer {
    AnimationStreamer::new(
        config,
        Box::new(library()),
        FaceAssetStore::new(),
        RecordingTransport::default(),
        RecordingDisplay::default(),
        RecordingAudio::default(),
    )
}

pub fn streamer() -> TestStreamer {
    streamer_with(test_config())
}

/// Sent messages without the periodic state reports.
pub fn commands(s: &TestStreamer) -> Vec<Message> {
    s.transport()
        .sent
        .iter()
        .filter(|m| !matches!(m, Message::AnimationState { .. }))
        .cloned()
        .collect()
}

/// Tick until the current session is gone; returns the number of ticks.
pub fn run_until_idle(s: &mut TestStreamer, max_ticks: usize) -> usize {
    let mut n = 0;
    while s.is_streaming() {
        assert!(n < max_ticks, "still streaming after {max_ticks} ticks");
        s.update();
        n += 1;
    }
    n
}

pub fn run_ticks(s: &mut TestStreamer, ticks: usize) {
    for _ in 0..ticks {
        s.update();
    }
}
