use animstream_animation_core::face::{FaceAssetStore, FaceBitmap};
use animstream_animation_core::{
    AnimationLibrary, AnimationStreamer, AudioClient, AudioRef, Config, DisplaySink, Message, Tag,
    Transport,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

struct Sink;

impl Transport for Sink {
    fn send(&mut self, msg: &Message) -> bool {
        black_box(msg);
        true
    }
}

impl DisplaySink for Sink {
    fn draw_frame(&mut self, frame: &FaceBitmap) {
        black_box(frame);
    }
}

impl AudioClient for Sink {
    fn play(&mut self, audio: &AudioRef) {
        black_box(audio);
    }
    fn stop_all(&mut self) {}
    fn has_active_events(&self) -> bool {
        false
    }
}

fn streamer(keep_alive: bool) -> AnimationStreamer<Sink, Sink, Sink> {
    let mut lib = AnimationLibrary::new();
    for key in animstream_test_fixtures::animations::keys() {
        let json = animstream_test_fixtures::animations::json(&key).expect("fixture");
        lib.load_json(&json).expect("parse fixture");
    }
    let config = Config {
        random_seed: Some(1),
        enable_keep_face_alive: keep_alive,
        idle_timeout_ms: 0,
        ..Config::default()
    };
    AnimationStreamer::new(config, Box::new(lib), FaceAssetStore::new(), Sink, Sink, Sink)
}

fn bench_tick(c: &mut Criterion) {
    let mut looping = streamer(false);
    looping
        .set_streaming_animation_by_name("squint_face", Tag(1), 0, false, false)
        .expect("start");
    c.bench_function("tick_looping_face_animation", |b| b.iter(|| looping.update()));

    let mut idle = streamer(true);
    c.bench_function("tick_idle_keep_alive", |b| b.iter(|| idle.update()));
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
