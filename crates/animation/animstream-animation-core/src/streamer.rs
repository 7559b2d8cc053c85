//! The streaming engine.
//!
//! One animation streams at a time. Each call to [`AnimationStreamer::update`]
//! is one fixed tick: procedural layers are refreshed, the idle path restores
//! the neutral face and keeps it alive, and an active session emits whatever
//! its tracks have due. The virtual clock (`now_ms`) advances by exactly one
//! tick per update, independent of wall time.

use animstream_face_core::{render, FaceAssetStore, FaceBitmap, ProceduralFace, PROCEDURAL_ANIMATION_NAME};
use serde::Serialize;

use crate::animation::Animation;
use crate::config::{Config, KeepAliveParam, KeepAliveParams};
use crate::error::StreamError;
use crate::flags::TrackFlags;
use crate::ids::Tag;
use crate::interfaces::{AnimationLoader, AudioClient, DisplaySink, Transport};
use crate::keyframe::{
    BackpackLightsKeyFrame, CommandKeyFrame, FaceAnimationKeyFrame, KeyFrame, KeyFrameKind,
    ProceduralFaceKeyFrame, RobotAudioKeyFrame,
};
use crate::layers::TrackLayerComponent;
use crate::messages::{Message, RobotCommand};
use crate::track::Track;

/// Bookkeeping for the animation currently streaming.
#[derive(Debug)]
struct Session {
    animation: Animation,
    tag: Tag,
    /// Engine time at which the current loop pass started.
    start_time_ms: u32,
    /// Animation time of the current pass.
    streaming_time_ms: u32,
    /// Target number of passes; 0 loops forever.
    num_loops: u32,
    loop_ctr: u32,
    start_sent: bool,
    end_sent: bool,
    is_internal: bool,
    is_procedural: bool,
    audio_wait_ticks: u32,
}

impl Session {
    fn restart_pass(&mut self, now_ms: u32) {
        self.animation.init();
        self.start_time_ms = now_ms;
        self.streaming_time_ms = 0;
        self.start_sent = false;
        self.end_sent = false;
        self.audio_wait_ticks = 0;
    }

    #[inline]
    fn is_finished(&self) -> bool {
        self.end_sent && !self.animation.has_frames_left()
    }
}

/// What became of the last session that left the streamer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSummary {
    pub name: String,
    pub tag: Tag,
    pub loops_completed: u32,
    pub aborted: bool,
}

pub struct AnimationStreamer<T: Transport, D: DisplaySink, A: AudioClient> {
    config: Config,
    loader: Box<dyn AnimationLoader>,
    face_store: FaceAssetStore,
    transport: T,
    display: D,
    audio: A,
    layers: TrackLayerComponent,

    /// Runtime-built animation for streamed faces. Moved into the session
    /// while it streams.
    procedural_animation: Animation,
    session: Option<Session>,
    last_session: Option<SessionSummary>,

    now_ms: u32,
    ticks: u64,
    last_anim_stream_time_ms: u32,
    was_interrupted_with_nothing: bool,

    locked_tracks: TrackFlags,
    tracks_in_use: TrackFlags,
    backpack_layer_on: bool,
    next_proc_face_allowed_ms: u32,

    keep_face_alive: bool,
    keep_alive: KeepAliveParams,
}

impl<T: Transport, D: DisplaySink, A: AudioClient> AnimationStreamer<T, D, A> {
    pub fn new(
        config: Config,
        loader: Box<dyn AnimationLoader>,
        face_store: FaceAssetStore,
        transport: T,
        display: D,
        audio: A,
    ) -> Self {
        if loader.get_animation(&config.neutral_animation).is_none() {
            let err = StreamError::MissingAsset {
                name: config.neutral_animation.clone(),
            };
            log::error!("AnimationStreamer.Init: {err}; idle face will stay blank");
        }

        let mut procedural_animation = Animation::new(PROCEDURAL_ANIMATION_NAME);
        procedural_animation.set_is_live(true);

        Self {
            layers: TrackLayerComponent::new(config.tick_ms, config.random_seed),
            keep_face_alive: config.enable_keep_face_alive,
            keep_alive: config.keep_alive.clone(),
            config,
            loader,
            face_store,
            transport,
            display,
            audio,
            procedural_animation,
            session: None,
            last_session: None,
            now_ms: 0,
            ticks: 0,
            last_anim_stream_time_ms: 0,
            was_interrupted_with_nothing: true,
            locked_tracks: TrackFlags::empty(),
            tracks_in_use: TrackFlags::empty(),
            backpack_layer_on: false,
            next_proc_face_allowed_ms: 0,
        }
    }

    // ----- session control -----

    /// Start streaming `animation`. An animation with an empty name stands for
    /// "nothing" and aborts the current session.
    pub fn set_streaming_animation(
        &mut self,
        animation: Animation,
        tag: Tag,
        num_loops: u32,
        interrupt: bool,
        is_internal: bool,
    ) -> Result<(), StreamError> {
        if animation.name().is_empty() {
            self.abort();
            return Ok(());
        }
        self.start_session(animation, tag, num_loops, interrupt, is_internal, false)
    }

    /// Look up `name` through the loader and stream it. An empty name aborts.
    pub fn set_streaming_animation_by_name(
        &mut self,
        name: &str,
        tag: Tag,
        num_loops: u32,
        interrupt: bool,
        is_internal: bool,
    ) -> Result<(), StreamError> {
        if name.is_empty() {
            self.abort();
            return Ok(());
        }
        let Some(animation) = self.loader.get_animation(name).cloned() else {
            log::warn!("AnimationStreamer.SetStreamingAnimation: unknown animation '{name}'");
            return Err(StreamError::UnknownAnimation {
                name: name.to_string(),
            });
        };
        self.start_session(animation, tag, num_loops, interrupt, is_internal, false)
    }

    fn start_session(
        &mut self,
        mut animation: Animation,
        tag: Tag,
        num_loops: u32,
        interrupt: bool,
        is_internal: bool,
        is_procedural: bool,
    ) -> Result<(), StreamError> {
        if let Some(current) = &self.session {
            if !interrupt {
                log::info!(
                    "AnimationStreamer.SetStreamingAnimation: busy with '{}', not starting '{}'",
                    current.animation.name(),
                    animation.name()
                );
                return Err(StreamError::Busy {
                    current: current.animation.name().to_string(),
                    requested: animation.name().to_string(),
                });
            }
            log::warn!(
                "AnimationStreamer.SetStreamingAnimation: '{}' interrupts '{}'",
                animation.name(),
                current.animation.name()
            );
            self.abort();
        }

        animation.init();
        let grace_ms = self.config.ticks_to_ms(self.config.keep_alive_removal_grace_ticks);
        self.layers.remove_keep_face_alive(grace_ms, self.now_ms);
        self.tracks_in_use = TrackFlags::empty();

        log::info!(
            "AnimationStreamer.SetStreamingAnimation: '{}' tag {} loops {}{}",
            animation.name(),
            tag.0,
            num_loops,
            if is_internal { " (internal)" } else { "" }
        );
        self.session = Some(Session {
            animation,
            tag,
            start_time_ms: self.now_ms,
            streaming_time_ms: 0,
            num_loops,
            loop_ctr: 0,
            start_sent: false,
            end_sent: false,
            is_internal,
            is_procedural,
            audio_wait_ticks: 0,
        });
        self.was_interrupted_with_nothing = false;
        Ok(())
    }

    /// Stop the current session, if any. Sends an aborted end notification
    /// when a start was already sent.
    pub fn abort(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        log::info!(
            "AnimationStreamer.Abort: '{}' tag {}",
            session.animation.name(),
            session.tag.0
        );

        if session.start_sent && !session.end_sent {
            self.send_end(&mut session, true);
        }
        self.layers.clear_backpack_layers();
        self.set_backpack_layer(false);
        self.audio.stop_all();

        if let Some(kf) = session.animation.face_animation.current_mut() {
            kf.reset();
        }

        self.last_session = Some(SessionSummary {
            name: session.animation.name().to_string(),
            tag: session.tag,
            loops_completed: session.loop_ctr,
            aborted: true,
        });
        self.release_session(session);
        self.was_interrupted_with_nothing = true;
    }

    /// Give the procedural animation back once its session is over.
    fn release_session(&mut self, session: Session) {
        if session.is_procedural {
            self.face_store.clear_animation(PROCEDURAL_ANIMATION_NAME);
            let mut anim = session.animation;
            anim.clear();
            self.procedural_animation = anim;
        }
    }

    // ----- ticking -----

    /// One fixed tick.
    pub fn update(&mut self) {
        self.layers.update(self.now_ms);
        self.audio.tick();

        if self.session.is_none() {
            let idle_ms = self.now_ms.saturating_sub(self.last_anim_stream_time_ms);
            if idle_ms >= self.config.idle_timeout_ms {
                if self.was_interrupted_with_nothing {
                    self.was_interrupted_with_nothing = false;
                    self.restore_neutral();
                }
                if self.keep_face_alive {
                    self.layers.keep_face_alive(&self.keep_alive, self.now_ms);
                }
            }
        }

        let mut streamed = false;
        if let Some(session) = self.session.as_mut() {
            if session.is_finished() {
                session.loop_ctr += 1;
                if session.num_loops == 0 || session.loop_ctr < session.num_loops {
                    log::debug!(
                        "AnimationStreamer.Update: '{}' pass {} done, looping",
                        session.animation.name(),
                        session.loop_ctr
                    );
                    session.restart_pass(self.now_ms);
                    let grace_ms = self.config.ticks_to_ms(self.config.keep_alive_removal_grace_ticks);
                    self.layers.remove_keep_face_alive(grace_ms, self.now_ms);
                    self.tracks_in_use = TrackFlags::empty();
                    // the next pass streams from the following tick
                    streamed = true;
                } else if let Some(done) = self.session.take() {
                    log::debug!(
                        "AnimationStreamer.Update: '{}' finished after {} loops",
                        done.animation.name(),
                        done.loop_ctr
                    );
                    self.last_session = Some(SessionSummary {
                        name: done.animation.name().to_string(),
                        tag: done.tag,
                        loops_completed: done.loop_ctr,
                        aborted: false,
                    });
                    self.release_session(done);
                }
            } else {
                if let Err(e) = self.update_stream() {
                    log::error!("AnimationStreamer.Update: {e}");
                }
                streamed = true;
            }
        }

        if !streamed && self.layers.have_layers_to_send() {
            self.stream_layers_only();
        }

        if self.config.state_report_period_ticks > 0
            && self.ticks % u64::from(self.config.state_report_period_ticks) == 0
        {
            self.send_state();
        }

        self.ticks += 1;
        self.now_ms = self.now_ms.wrapping_add(self.config.tick_ms);
    }

    fn restore_neutral(&mut self) {
        let neutral = self.loader.get_animation(&self.config.neutral_animation).cloned();
        let Some(anim) = neutral else {
            let err = StreamError::MissingAsset {
                name: self.config.neutral_animation.clone(),
            };
            log::error!("AnimationStreamer.Update: {err}");
            return;
        };
        log::debug!("AnimationStreamer.Update: restoring neutral face '{}'", anim.name());
        if let Err(e) = self.start_session(anim, Tag::NOT_ANIMATING, 1, false, true, false) {
            log::warn!("AnimationStreamer.Update: neutral face not started: {e}");
        }
    }

    /// Stream one tick of the current session.
    pub fn update_stream(&mut self) -> Result<(), StreamError> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        let result = self.stream_session(&mut session);
        self.session = Some(session);
        result
    }

    fn stream_session(&mut self, s: &mut Session) -> Result<(), StreamError> {
        if !s.animation.is_initialized() {
            let err = StreamError::NotInitialized {
                name: s.animation.name().to_string(),
            };
            log::error!("AnimationStreamer.UpdateStream: {err}");
            return Err(err);
        }

        if !s.start_sent {
            self.send_start(s);
        }

        let tick = self.config.tick_ms;
        let t = s.streaming_time_ms;

        // audio goes straight to the audio client, never to the robot
        let due_audio = s
            .animation
            .robot_audio
            .current()
            .filter(|kf| kf.is_time_to_play(t))
            .cloned();
        if let Some(kf) = due_audio {
            self.play_audio(&kf);
            s.animation.robot_audio.advance();
        }

        if s.animation.has_frames_left() {
            let layered = self.layers.apply_layers_to_anim(
                Some(&mut s.animation),
                s.start_time_ms,
                s.start_time_ms.wrapping_add(t),
                &ProceduralFace::default(),
            );
            if let Some(kf) = &layered.audio {
                self.play_audio(kf);
            }

            self.stream_track(&mut s.animation.head_angle, t);
            self.stream_track(&mut s.animation.lift_height, t);

            let due_event = s
                .animation
                .event
                .current()
                .filter(|kf| kf.is_time_to_play(t))
                .map(|kf| kf.event_id.clone());
            if let Some(event_id) = due_event {
                if !self.locked_tracks.contains(TrackFlags::EVENT) {
                    self.send(Message::AnimationEvent {
                        event_id,
                        timestamp_ms: self.now_ms,
                        tag: s.tag,
                    });
                }
                s.animation.event.advance();
            }

            let drew_bitmap = self.stream_face_bitmap(&mut s.animation, t);
            if drew_bitmap {
                self.next_proc_face_allowed_ms = self.now_ms.wrapping_add(
                    self.config
                        .ticks_to_ms(self.config.min_ticks_between_authored_and_procedural_face),
                );
            } else if let Some(face) = &layered.face {
                self.draw_procedural_face(face);
            }

            let authored_lights_due = s
                .animation
                .backpack_lights
                .current()
                .is_some_and(|kf| kf.is_time_to_play(t));
            let sent_lights = if authored_lights_due {
                self.stream_track(&mut s.animation.backpack_lights, t)
            } else if let Some(kf) = layered.backpack {
                self.send_layered_lights(kf)
            } else {
                false
            };
            if sent_lights {
                self.set_backpack_layer(true);
            }

            self.stream_track(&mut s.animation.body_motion, t);
            self.stream_track(&mut s.animation.record_heading, t);
            self.stream_track(&mut s.animation.turn_to_recorded_heading, t);

            s.streaming_time_ms = t + tick;
            self.last_anim_stream_time_ms = self.now_ms;
        }

        if !s.animation.has_frames_left() && s.start_sent && !s.end_sent {
            if self.audio.has_active_events() && s.audio_wait_ticks < self.config.audio_end_grace_ticks {
                s.audio_wait_ticks += 1;
            } else {
                if self.audio.has_active_events() {
                    log::warn!(
                        "AnimationStreamer.UpdateStream: '{}' ending with audio still playing after {} ticks",
                        s.animation.name(),
                        s.audio_wait_ticks
                    );
                }
                self.stop_tracks_in_use();
                self.send_end(s, false);
            }
        }
        Ok(())
    }

    /// Evaluate the current keyframe of a command track. Its clock and cursor
    /// move even when the track is locked; only the command is dropped.
    /// Returns whether a command was sent.
    fn stream_track<K: CommandKeyFrame>(&mut self, track: &mut Track<K>, anim_time_ms: u32) -> bool {
        let Some(kf) = track.current_mut() else {
            return false;
        };
        if !kf.is_time_to_play(anim_time_ms) {
            return false;
        }
        let cmd = kf.try_emit(self.layers.rng());
        if kf.is_done(self.config.tick_ms) {
            track.advance();
        }
        let Some(cmd) = cmd else {
            return false;
        };
        if self.locked_tracks.contains(K::TRACK) {
            log::trace!("AnimationStreamer.UpdateStream: {} locked, dropping {cmd:?}", K::TRACK_NAME);
            return false;
        }
        self.send(Message::Robot(cmd));
        if TrackFlags::STOPPABLE.contains(K::TRACK) {
            self.tracks_in_use |= K::TRACK;
        }
        true
    }

    /// Raw images first, then face-asset frames. True when a bitmap reached
    /// the display.
    fn stream_face_bitmap(&mut self, anim: &mut Animation, t: u32) -> bool {
        let tick = self.config.tick_ms;
        let locked = self.locked_tracks.contains(TrackFlags::FACE_IMAGE);

        if let Some(kf) = anim.face_image.current_mut() {
            if kf.is_time_to_play(t) {
                let img = kf.face_image();
                if kf.is_done(tick) {
                    anim.face_image.advance();
                }
                if !locked {
                    self.display.draw_frame(&img);
                    return true;
                }
                return false;
            }
        }

        let Some(kf) = anim.face_animation.current_mut() else {
            return false;
        };
        if !kf.is_time_to_play(t) {
            return false;
        }
        if !self.face_store.contains(&kf.anim_name) {
            log::warn!(
                "AnimationStreamer.UpdateStream: face animation '{}' not in the face store",
                kf.anim_name
            );
        }
        let img = kf.next_frame(&self.face_store, tick);
        if kf.is_done(&self.face_store) {
            kf.reset();
            anim.face_animation.advance();
        }
        match img {
            Some(img) if !locked => {
                self.display.draw_frame(&img);
                true
            }
            _ => false,
        }
    }

    fn draw_procedural_face(&mut self, face: &ProceduralFace) {
        if self.locked_tracks.contains(TrackFlags::PROCEDURAL_FACE) {
            return;
        }
        if self.now_ms < self.next_proc_face_allowed_ms {
            return;
        }
        self.display.draw_frame(&render(face));
    }

    fn send_layered_lights(&mut self, kf: BackpackLightsKeyFrame) -> bool {
        if self.locked_tracks.contains(TrackFlags::BACKPACK_LIGHTS) {
            return false;
        }
        self.send(Message::Robot(RobotCommand::SetBackpackLights { lights: kf.lights }));
        true
    }

    fn play_audio(&mut self, kf: &RobotAudioKeyFrame) {
        if self.locked_tracks.contains(TrackFlags::AUDIO) {
            return;
        }
        if let Some(audio) = kf.select_audio_ref(self.layers.rng()) {
            self.audio.play(audio);
        }
    }

    /// Ambient-only pass while nothing streams.
    fn stream_layers_only(&mut self) {
        let layered = self.layers.apply_layers_to_anim(
            None,
            self.now_ms,
            self.now_ms,
            &ProceduralFace::default(),
        );
        if let Some(kf) = &layered.audio {
            self.play_audio(kf);
        }
        if let Some(face) = &layered.face {
            self.draw_procedural_face(face);
        }
        match layered.backpack {
            Some(kf) => {
                if self.send_layered_lights(kf) {
                    self.set_backpack_layer(true);
                }
            }
            None => self.set_backpack_layer(false),
        }
    }

    // ----- outbound -----

    fn send(&mut self, msg: Message) {
        if !self.transport.send(&msg) {
            log::warn!("AnimationStreamer.Send: transport dropped {msg:?}");
        }
    }

    fn send_start(&mut self, s: &mut Session) {
        debug_assert!(!s.start_sent, "start sent twice");
        if !s.is_internal {
            self.send(Message::AnimationStarted {
                name: s.animation.name().to_string(),
                tag: s.tag,
            });
        }
        s.start_sent = true;
    }

    fn send_end(&mut self, s: &mut Session, was_aborted: bool) {
        debug_assert!(s.start_sent && !s.end_sent, "end without start, or sent twice");
        if !s.is_internal {
            self.send(Message::AnimationEnded {
                name: s.animation.name().to_string(),
                tag: s.tag,
                was_aborted,
            });
        }
        s.end_sent = true;
        self.set_backpack_layer(false);
    }

    fn set_backpack_layer(&mut self, on: bool) {
        if self.backpack_layer_on == on {
            return;
        }
        self.backpack_layer_on = on;
        self.send(Message::BackpackSetLayer { layer: u8::from(on) });
    }

    fn stop_tracks_in_use(&mut self) {
        let in_use = std::mem::take(&mut self.tracks_in_use);
        if in_use.contains(TrackFlags::HEAD) {
            self.send(RobotCommand::MoveHead { speed_rad_per_sec: 0.0 }.into());
        }
        if in_use.contains(TrackFlags::LIFT) {
            self.send(RobotCommand::MoveLift { speed_rad_per_sec: 0.0 }.into());
        }
        if in_use.contains(TrackFlags::BODY) {
            self.send(
                RobotCommand::DriveWheels {
                    left_mmps: 0.0,
                    right_mmps: 0.0,
                    left_accel_mmps2: 0.0,
                    right_accel_mmps2: 0.0,
                }
                .into(),
            );
        }
    }

    fn send_state(&mut self) {
        let proc_anim = match &self.session {
            Some(s) if s.is_procedural => &s.animation,
            _ => &self.procedural_animation,
        };
        // frames of the procedural sprite sequence still to be shown
        let pending_frames = proc_anim
            .face_animation
            .current()
            .filter(|kf| kf.anim_name == PROCEDURAL_ANIMATION_NAME)
            .map_or(0, |kf| {
                self.face_store
                    .num_frames(PROCEDURAL_ANIMATION_NAME)
                    .saturating_sub(kf.current_frame())
            });
        let msg = Message::AnimationState {
            num_proc_anim_face_keyframes: pending_frames as u32,
            locked_tracks: self.locked_tracks,
            tracks_in_use: self.tracks_in_use,
        };
        self.send(msg);
    }

    // ----- runtime faces -----

    /// Show `face` for `duration_ms` through the procedural animation,
    /// interrupting whatever streams.
    pub fn set_procedural_face(&mut self, face: ProceduralFace, duration_ms: u32) -> Result<(), StreamError> {
        self.abort();
        let tick = self.config.tick_ms;
        let mut anim = std::mem::take(&mut self.procedural_animation);
        anim.clear();
        anim.set_is_live(true);
        anim.add_keyframe(KeyFrame::ProceduralFace(ProceduralFaceKeyFrame::new(0, face.clone())))?;
        if duration_ms > tick {
            anim.add_keyframe(KeyFrame::ProceduralFace(ProceduralFaceKeyFrame::new(
                duration_ms - tick,
                face,
            )))?;
        }
        self.start_session(anim, Tag::NOT_ANIMATING, 1, true, true, true)
    }

    /// Queue a raw face image. Consecutive images extend the running
    /// procedural face animation.
    pub fn set_face_image(&mut self, image: &FaceBitmap, duration_ms: u32) -> Result<(), StreamError> {
        let extends_current = self
            .session
            .as_ref()
            .is_some_and(|s| s.is_procedural && s.animation.face_animation.has_frames_left());
        if extends_current {
            self.face_store.add_procedural_image(image);
            return Ok(());
        }

        self.abort();
        self.face_store.clear_animation(PROCEDURAL_ANIMATION_NAME);
        self.face_store.add_procedural_image(image);

        let mut anim = std::mem::take(&mut self.procedural_animation);
        anim.clear();
        anim.set_is_live(true);
        let mut kf = FaceAnimationKeyFrame::new(0, PROCEDURAL_ANIMATION_NAME);
        kf.frame_duration_ms = Some(duration_ms);
        anim.add_keyframe(KeyFrame::FaceAnimation(kf))?;
        self.start_session(anim, Tag::NOT_ANIMATING, 1, true, true, true)
    }

    // ----- keep-alive -----

    /// Turning keep-alive off fades the current eye dart out over
    /// `disable_timeout_ms`.
    pub fn enable_keep_face_alive(&mut self, enable: bool, disable_timeout_ms: u32) {
        if self.keep_face_alive && !enable {
            self.layers.remove_keep_face_alive(disable_timeout_ms, self.now_ms);
        }
        self.keep_face_alive = enable;
    }

    #[inline]
    pub fn is_keep_face_alive_enabled(&self) -> bool {
        self.keep_face_alive
    }

    pub fn set_keep_face_alive_param(&mut self, param: KeepAliveParam, value: f32) {
        self.keep_alive.set(param, value);
        if param.is_timing() {
            self.layers.reset_keep_alive_timers();
        }
    }

    #[inline]
    pub fn keep_alive_params(&self) -> &KeepAliveParams {
        &self.keep_alive
    }

    // ----- locks -----

    pub fn lock_tracks(&mut self, tracks: TrackFlags) {
        self.locked_tracks |= tracks;
    }

    pub fn unlock_tracks(&mut self, tracks: TrackFlags) {
        self.locked_tracks &= !tracks;
    }

    #[inline]
    pub fn locked_tracks(&self) -> TrackFlags {
        self.locked_tracks
    }

    #[inline]
    pub fn tracks_in_use(&self) -> TrackFlags {
        self.tracks_in_use
    }

    // ----- accessors -----

    #[inline]
    pub fn is_streaming(&self) -> bool {
        self.session.is_some()
    }

    pub fn streaming_animation_name(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.animation.name())
    }

    pub fn streaming_tag(&self) -> Option<Tag> {
        self.session.as_ref().map(|s| s.tag)
    }

    /// Passes completed by the current session.
    pub fn streaming_loop_count(&self) -> Option<u32> {
        self.session.as_ref().map(|s| s.loop_ctr)
    }

    pub fn last_session(&self) -> Option<&SessionSummary> {
        self.last_session.as_ref()
    }

    #[inline]
    pub fn now_ms(&self) -> u32 {
        self.now_ms
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layers(&self) -> &TrackLayerComponent {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut TrackLayerComponent {
        &mut self.layers
    }

    pub fn face_store(&self) -> &FaceAssetStore {
        &self.face_store
    }

    pub fn face_store_mut(&mut self) -> &mut FaceAssetStore {
        &mut self.face_store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::{AudioRef, HeadAngleKeyFrame};
    use crate::loader::AnimationLibrary;

    #[derive(Default)]
    struct Sent(Vec<Message>);
    impl Transport for Sent {
        fn send(&mut self, msg: &Message) -> bool {
            self.0.push(msg.clone());
            true
        }
    }

    #[derive(Default)]
    struct Frames(usize);
    impl DisplaySink for Frames {
        fn draw_frame(&mut self, _frame: &FaceBitmap) {
            self.0 += 1;
        }
    }

    #[derive(Default)]
    struct Silent;
    impl AudioClient for Silent {
        fn play(&mut self, _audio: &AudioRef) {}
        fn stop_all(&mut self) {}
        fn has_active_events(&self) -> bool {
            false
        }
    }

    fn streamer() -> AnimationStreamer<Sent, Frames, Silent> {
        let config = Config {
            random_seed: Some(3),
            enable_keep_face_alive: false,
            ..Config::default()
        };
        AnimationStreamer::new(
            config,
            Box::new(AnimationLibrary::new()),
            FaceAssetStore::new(),
            Sent::default(),
            Frames::default(),
            Silent,
        )
    }

    fn nod() -> Animation {
        let mut anim = Animation::new("nod");
        anim.add_keyframe(KeyFrame::HeadAngle(HeadAngleKeyFrame::new(0, 10, 0, 0)))
            .unwrap();
        anim
    }

    #[test]
    fn update_stream_rejects_uninitialized_animation() {
        let mut s = streamer();
        s.set_streaming_animation(nod(), Tag(1), 1, false, false)
            .unwrap();
        s.session.as_mut().unwrap().animation.clear();
        assert!(matches!(
            s.update_stream(),
            Err(StreamError::NotInitialized { .. })
        ));
        // the session survives the failed tick
        assert!(s.is_streaming());
    }

    #[test]
    fn update_stream_without_session_is_noop() {
        let mut s = streamer();
        assert!(s.update_stream().is_ok());
        assert!(s.transport().0.is_empty());
    }

    #[test]
    fn busy_unless_interrupting() {
        let mut s = streamer();
        s.set_streaming_animation(nod(), Tag(1), 1, false, false)
            .unwrap();
        let err = s
            .set_streaming_animation(nod(), Tag(2), 1, false, false)
            .unwrap_err();
        assert!(matches!(err, StreamError::Busy { .. }));
        s.set_streaming_animation(nod(), Tag(2), 1, true, false)
            .unwrap();
        assert_eq!(s.streaming_tag(), Some(Tag(2)));
    }

    #[test]
    fn unknown_name_is_reported() {
        let mut s = streamer();
        assert!(matches!(
            s.set_streaming_animation_by_name("nope", Tag(1), 1, false, false),
            Err(StreamError::UnknownAnimation { .. })
        ));
        assert!(s.set_streaming_animation_by_name("", Tag(1), 1, false, false).is_ok());
        assert!(!s.is_streaming());
    }
}
