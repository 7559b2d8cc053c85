use animstream_face_core::{decode, encode, render, FaceBitmap, ProceduralFace};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_codec(c: &mut Criterion) {
    let face = render(&ProceduralFace::default());
    let noisy = FaceBitmap::from_fn(|x, y| (x * 7 + y * 13) % 5 == 0);
    let face_frame = encode(&face);
    let noisy_frame = encode(&noisy);

    c.bench_function("encode_neutral_face", |b| b.iter(|| encode(black_box(&face))));
    c.bench_function("encode_noisy_frame", |b| b.iter(|| encode(black_box(&noisy))));
    c.bench_function("decode_neutral_face", |b| {
        b.iter(|| decode(black_box(face_frame.as_bytes())))
    });
    c.bench_function("decode_noisy_frame", |b| {
        b.iter(|| decode(black_box(noisy_frame.as_bytes())))
    });
    c.bench_function("render_neutral_face", |b| {
        b.iter(|| render(black_box(&ProceduralFace::default())))
    });
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
