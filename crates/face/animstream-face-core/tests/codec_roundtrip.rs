use animstream_face_core::{
    decode, encode, render, try_decode, FaceBitmap, ProceduralFace, FACE_HEIGHT, FACE_WIDTH,
    MAX_FACE_FRAME_SIZE,
};
use proptest::prelude::*;

fn bitmap_from_bits(bits: &[bool]) -> FaceBitmap {
    FaceBitmap::from_fn(|x, y| bits[y * FACE_WIDTH + x])
}

/// Sparse images exercise the clear/repeat/pattern opcodes; dense ones the raw fallback.
fn arb_bitmap() -> impl Strategy<Value = FaceBitmap> {
    prop_oneof![
        prop::collection::vec(prop::bool::weighted(0.02), FACE_WIDTH * FACE_HEIGHT),
        prop::collection::vec(prop::bool::weighted(0.5), FACE_WIDTH * FACE_HEIGHT),
    ]
    .prop_map(|bits| bitmap_from_bits(&bits))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// it should decode every encoded image back to itself within the size bound
    #[test]
    fn encode_decode_is_identity(bmp in arb_bitmap()) {
        let frame = encode(&bmp);
        prop_assert!(frame.len() <= MAX_FACE_FRAME_SIZE);
        prop_assert_eq!(try_decode(frame.as_bytes()).unwrap(), bmp);
    }

    /// it should keep vertical bars (repeat runs) intact
    #[test]
    fn column_bands_roundtrip(start in 0usize..FACE_WIDTH, width in 1usize..80, mask in any::<u64>()) {
        let bmp = FaceBitmap::from_fn(|x, y| x >= start && x < start + width && (mask >> y) & 1 == 1);
        let frame = encode(&bmp);
        prop_assert_eq!(decode(frame.as_bytes()), bmp);
    }
}

/// it should compress a rendered neutral face well below the raw size
#[test]
fn rendered_face_compresses() {
    let bmp = render(&ProceduralFace::default());
    let frame = encode(&bmp);
    assert!(!frame.is_raw());
    assert!(frame.len() < MAX_FACE_FRAME_SIZE / 4, "len={}", frame.len());
    assert_eq!(frame.decode(), bmp);
}

/// it should treat exactly MAX_FACE_FRAME_SIZE bytes as raw packed columns
#[test]
fn raw_length_is_detected() {
    let mut raw = vec![0u8; MAX_FACE_FRAME_SIZE];
    raw[0] = 0b1; // column 0, row 0
    raw[8] = 0b10; // column 1, row 1
    let bmp = try_decode(&raw).unwrap();
    assert!(bmp.get(0, 0));
    assert!(bmp.get(1, 1));
    assert_eq!(bmp.lit_count(), 2);
}

/// it should refuse to decode oversized payloads
#[test]
fn oversized_payload_is_blank() {
    let raw = vec![0xFFu8; MAX_FACE_FRAME_SIZE + 1];
    assert!(try_decode(&raw).is_err());
    assert!(decode(&raw).is_blank());
}
