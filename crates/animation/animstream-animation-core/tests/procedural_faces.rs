mod common;

use animstream_animation_core::face::{FaceBitmap, ProceduralFace, PROCEDURAL_ANIMATION_NAME};
use animstream_animation_core::layers::face::KEEP_ALIVE_EYE_DART_LAYER;
use animstream_animation_core::layers::FaceLayerManager;
use animstream_animation_core::{
    Animation, BackpackLights, BackpackLightsKeyFrame, Config, FaceAnimationKeyFrame,
    KeepAliveParam, KeyFrame, Message, ProceduralFaceKeyFrame, Rgb, RobotCommand, Tag, Track,
};
use common::*;

fn stripes(period: usize) -> FaceBitmap {
    FaceBitmap::from_fn(|x, y| (x / period + y) % 2 == 0)
}

fn squinted() -> ProceduralFace {
    let mut face = ProceduralFace::default();
    face.set_both_eyes(|e| e.scale_y = 0.4);
    face
}

/// it should show a runtime procedural face for the requested time without
/// telling listeners
#[test]
fn procedural_face_streams_internally() {
    let mut s = streamer();
    s.set_procedural_face(squinted(), 330).unwrap();
    assert_eq!(s.streaming_tag(), Some(Tag::NOT_ANIMATING));

    s.update();
    let first_state = s.transport().sent.iter().find_map(|m| match m {
        Message::AnimationState {
            num_proc_anim_face_keyframes,
            ..
        } => Some(*num_proc_anim_face_keyframes),
        _ => None,
    });
    // no sprite frames pending for a procedural face
    assert_eq!(first_state, Some(0));

    run_until_idle(&mut s, 50);
    // one frame per tick from 0 to 297ms
    assert_eq!(s.display().frames.len(), 10);
    assert!(commands(&s).is_empty());
}

/// it should chain consecutive face images into one procedural animation
#[test]
fn face_images_extend_the_running_animation() {
    let mut s = streamer();
    let a = stripes(2);
    let b = stripes(5);
    s.set_face_image(&a, 66).unwrap();
    s.set_face_image(&b, 66).unwrap();
    assert_eq!(s.face_store().num_frames(PROCEDURAL_ANIMATION_NAME), 2);

    assert_eq!(run_until_idle(&mut s, 50), 5);
    assert_eq!(s.display().frames, vec![a.clone(), a, b.clone(), b]);
    assert_eq!(s.face_store().num_frames(PROCEDURAL_ANIMATION_NAME), 0);
    assert!(commands(&s).is_empty());
}

/// it should let an authored bitmap win over a procedural face on the same
/// tick, and hold procedural faces off briefly afterwards
#[test]
fn authored_bitmap_beats_procedural_face() {
    let mut s = streamer();
    let a = stripes(3);
    let b = stripes(4);
    s.face_store_mut().add_image("blinky", &a);
    s.face_store_mut().add_image("blinky", &b);

    let mut anim = Animation::new("blinky_face");
    anim.add_keyframe(KeyFrame::FaceAnimation(FaceAnimationKeyFrame::new(0, "blinky")))
        .unwrap();
    anim.add_keyframe(KeyFrame::ProceduralFace(ProceduralFaceKeyFrame::new(
        0,
        ProceduralFace::default(),
    )))
    .unwrap();
    anim.add_keyframe(KeyFrame::ProceduralFace(ProceduralFaceKeyFrame::new(165, squinted())))
        .unwrap();
    s.set_streaming_animation(anim, Tag(9), 1, false, false)
        .unwrap();

    let mut drawn_per_tick = Vec::new();
    while s.is_streaming() {
        let before = s.display().frames.len();
        s.update();
        drawn_per_tick.push(s.display().frames.len() - before);
    }
    // bitmaps on ticks 0 and 1, a blocked tick, then procedural faces
    assert_eq!(drawn_per_tick, vec![1, 1, 0, 1, 1, 1, 0]);
    assert_eq!(s.display().frames[0], a);
    assert_eq!(s.display().frames[1], b);
}

/// it should prefer authored backpack lights over a backpack layer while the
/// animation streams, and fall back to the layer afterwards
#[test]
fn authored_lights_beat_backpack_layer() {
    let mut s = streamer();
    let mut track = Track::new();
    track
        .add_keyframe(BackpackLightsKeyFrame::new(
            0,
            BackpackLights {
                zones: [Rgb::new(1.0, 0.0, 0.0); 5],
            },
            0,
        ))
        .unwrap();
    s.layers_mut().add_persistent_backpack_layer("alert", track);

    s.set_streaming_animation_by_name("squint_face", Tag(2), 1, false, false)
        .unwrap();
    run_until_idle(&mut s, 50);
    s.update();

    let msgs = commands(&s);
    let ended = msgs
        .iter()
        .position(|m| matches!(m, Message::AnimationEnded { .. }))
        .expect("ended");
    let lights = |m: &Message| match m.as_robot() {
        Some(RobotCommand::SetBackpackLights { lights }) => Some(*lights),
        _ => None,
    };
    let is_red = |l: &BackpackLights| l.zones.iter().all(|z| z.r == 1.0);

    let during: Vec<_> = msgs[..ended].iter().filter_map(lights).collect();
    assert_eq!(during.len(), 7);
    assert!(during.iter().all(|l| !is_red(l)));
    assert!(msgs[ended..].iter().filter_map(lights).any(|l| is_red(&l)));
    assert_eq!(
        msgs.iter()
            .filter(|m| **m == Message::BackpackSetLayer { layer: 1 })
            .count(),
        2
    );
}

/// it should restore the neutral face once after an interrupt left nothing
/// streaming
#[test]
fn neutral_face_restored_after_abort() {
    let mut s = streamer();
    s.set_streaming_animation_by_name("wave", Tag(1), 1, false, false)
        .unwrap();
    run_ticks(&mut s, 2);
    s.abort();

    let mut neutral_ticks = 0;
    for _ in 0..40 {
        s.update();
        if s.streaming_animation_name() == Some("anim_neutral_eyes_01") {
            neutral_ticks += 1;
            assert_eq!(s.streaming_tag(), Some(Tag::NOT_ANIMATING));
        }
    }
    assert_eq!(neutral_ticks, 1);
    assert_eq!(s.display().frames.len(), 1);
    assert!(!commands(&s)
        .iter()
        .any(|m| matches!(m, Message::AnimationStarted { name, .. } if name == "anim_neutral_eyes_01")));
}

/// it should report queued face-image frames in the heartbeat until they play
#[test]
fn heartbeat_counts_pending_face_images() {
    let mut s = streamer();
    for period in [2, 3, 4] {
        s.set_face_image(&stripes(period), 66).unwrap();
    }
    run_ticks(&mut s, 5);
    let pending: Vec<u32> = s
        .transport()
        .sent
        .iter()
        .filter_map(|m| match m {
            Message::AnimationState {
                num_proc_anim_face_keyframes,
                ..
            } => Some(*num_proc_anim_face_keyframes),
            _ => None,
        })
        .collect();
    // heartbeats on ticks 0, 2 and 4; each image stays up two ticks
    assert_eq!(pending, vec![3, 2, 1]);
}

/// it should not restore the neutral face when an interrupting animation
/// finished on its own
#[test]
fn no_neutral_face_after_interrupting_animation_finishes() {
    let mut s = streamer();
    s.set_streaming_animation_by_name("wave", Tag(1), 1, false, false)
        .unwrap();
    run_ticks(&mut s, 2);
    s.set_streaming_animation_by_name("wave", Tag(2), 1, true, false)
        .unwrap();
    run_until_idle(&mut s, 50);
    assert!(!s.last_session().unwrap().aborted);

    for _ in 0..40 {
        s.update();
        assert!(!s.is_streaming());
    }
    assert!(s.display().frames.is_empty());
}

fn keep_alive_streamer() -> TestStreamer {
    let json = animstream_test_fixtures::configs::json("fast_idle").expect("config fixture");
    let config = Config::from_json_str(&json).expect("parse config");
    assert!(config.enable_keep_face_alive);
    streamer_with(config)
}

/// it should keep the idle face alive and let a new animation fade the eye
/// darts out
#[test]
fn keep_alive_runs_while_idle() {
    let mut s = keep_alive_streamer();
    run_ticks(&mut s, 60);
    assert!(s.display().frames.len() > 40);
    assert!(s
        .layers()
        .face_layers()
        .layers()
        .has_layer_named(KEEP_ALIVE_EYE_DART_LAYER));

    s.set_streaming_animation_by_name("wave", Tag(3), 0, false, false)
        .unwrap();
    run_ticks(&mut s, 90);
    assert!(!s.layers().face_layers().has_layers());
    s.abort();
}

/// it should stop generating keep-alive layers once disabled
#[test]
fn keep_alive_can_be_disabled() {
    let mut s = keep_alive_streamer();
    run_ticks(&mut s, 60);
    assert!(s.layers().face_layers().has_layers());

    s.enable_keep_face_alive(false, 0);
    assert!(!s.is_keep_face_alive_enabled());
    run_ticks(&mut s, 60);
    assert!(!s.layers().face_layers().has_layers());

    let drawn = s.display().frames.len();
    run_ticks(&mut s, 10);
    assert_eq!(s.display().frames.len(), drawn);
}

/// it should clamp blink spacing to the screen-protection limit
#[test]
fn keep_alive_params_are_tunable() {
    let mut s = keep_alive_streamer();
    s.set_keep_face_alive_param(KeepAliveParam::BlinkSpacingMaxMs, 90_000.0);
    assert_eq!(
        s.keep_alive_params().blink_spacing_max_ms,
        FaceLayerManager::max_blink_spacing_for_screen_protection_ms()
    );
    s.set_keep_face_alive_param(KeepAliveParam::EyeDartMaxDistancePx, 2.0);
    assert_eq!(s.keep_alive_params().eye_dart_max_distance_px, 2.0);
}

/// it should draw face layers on their own while nothing streams
#[test]
fn face_layers_draw_without_animation() {
    let mut s = streamer();
    let tag = s.layers_mut().add_squint("squint", 1.0, 0.5, 10.0);
    run_ticks(&mut s, 3);
    assert_eq!(s.display().frames.len(), 3);
    assert!(s.layers_mut().remove_face_layer(tag));
    run_ticks(&mut s, 2);
    assert_eq!(s.display().frames.len(), 3);
}
