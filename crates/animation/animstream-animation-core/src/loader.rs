use std::collections::BTreeMap;

use animstream_face_core::{EyeParams, ProceduralFace};
use hashbrown::HashMap;
use serde::Deserialize;

use crate::animation::Animation;
use crate::error::StreamError;
use crate::interfaces::AnimationLoader;
use crate::keyframe::{
    AudioRef, BackpackLightsKeyFrame, BodyMotionKeyFrame, BodyRadius, EventKeyFrame,
    FaceAnimationKeyFrame, HeadAngleKeyFrame, KeyFrame, LiftHeightKeyFrame,
    ProceduralFaceKeyFrame, RecordHeadingKeyFrame, RobotAudioKeyFrame,
    TurnToRecordedHeadingKeyFrame,
};
use crate::messages::{BackpackLights, Rgb};

/// Public API: parse a canned-animation JSON document into animations.
///
/// Notes:
/// - One document may hold several animations, keyed by name; the result is
///   ordered by name.
/// - Keyframes are sorted per track by trigger time, so files need not be.
/// - Raw face-image keyframes have no JSON form; they are built at runtime.
pub fn parse_animations_json(s: &str) -> Result<Vec<Animation>, StreamError> {
    let doc: BTreeMap<String, Vec<RawKeyFrame>> =
        serde_json::from_str(s).map_err(|e| StreamError::Parse {
            reason: e.to_string(),
        })?;

    let mut out = Vec::with_capacity(doc.len());
    for (name, raw_frames) in doc {
        let mut frames = raw_frames
            .into_iter()
            .map(|raw| raw.into_keyframe(&name))
            .collect::<Result<Vec<_>, _>>()?;
        frames.sort_by_key(KeyFrame::trigger_time_ms);

        let mut anim = Animation::new(name);
        for kf in frames {
            anim.add_keyframe(kf)?;
        }
        out.push(anim);
    }
    Ok(out)
}

/// In-memory name → animation registry.
#[derive(Clone, Debug, Default)]
pub struct AnimationLibrary {
    animations: HashMap<String, Animation>,
}

impl AnimationLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the animation previously stored under the same name.
    pub fn insert(&mut self, anim: Animation) -> Option<Animation> {
        self.animations.insert(anim.name().to_string(), anim)
    }

    /// Parse a JSON document and add (or replace) every animation in it.
    /// Returns how many were added.
    pub fn load_json(&mut self, s: &str) -> Result<usize, StreamError> {
        let anims = parse_animations_json(s)?;
        let n = anims.len();
        for anim in anims {
            log::debug!("AnimationLibrary.LoadJson: loaded '{}'", anim.name());
            self.insert(anim);
        }
        Ok(n)
    }

    pub fn get_animation(&self, name: &str) -> Option<&Animation> {
        self.animations.get(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.animations.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.animations.keys().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.animations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }
}

impl AnimationLoader for AnimationLibrary {
    fn get_animation(&self, name: &str) -> Option<&Animation> {
        AnimationLibrary::get_animation(self, name)
    }
}

// ----- conversion -----

impl RawKeyFrame {
    fn into_keyframe(self, anim: &str) -> Result<KeyFrame, StreamError> {
        let kf = match self {
            RawKeyFrame::HeadAngle {
                trigger_time_ms,
                angle_deg,
                angle_variability_deg,
                duration_ms,
            } => KeyFrame::HeadAngle(HeadAngleKeyFrame::new(
                trigger_time_ms,
                angle_deg,
                angle_variability_deg,
                duration_ms,
            )),
            RawKeyFrame::LiftHeight {
                trigger_time_ms,
                height_mm,
                height_variability_mm,
                duration_ms,
            } => KeyFrame::LiftHeight(LiftHeightKeyFrame::new(
                trigger_time_ms,
                height_mm,
                height_variability_mm,
                duration_ms,
            )),
            RawKeyFrame::BodyMotion {
                trigger_time_ms,
                speed,
                radius_mm,
                duration_ms,
            } => KeyFrame::BodyMotion(BodyMotionKeyFrame::new(
                trigger_time_ms,
                speed,
                radius_mm.to_body_radius(anim)?,
                duration_ms,
            )),
            RawKeyFrame::RecordHeading { trigger_time_ms } => {
                KeyFrame::RecordHeading(RecordHeadingKeyFrame { trigger_time_ms })
            }
            RawKeyFrame::TurnToRecordedHeading {
                trigger_time_ms,
                offset_deg,
                speed_deg_per_sec,
                accel_deg_per_sec2,
                decel_deg_per_sec2,
                tolerance_deg,
                num_half_revs,
                use_shortest_dir,
                duration_ms,
            } => {
                let mut kf = TurnToRecordedHeadingKeyFrame::default();
                kf.trigger_time_ms = trigger_time_ms;
                kf.offset_deg = offset_deg;
                kf.speed_deg_per_sec = speed_deg_per_sec;
                kf.accel_deg_per_sec2 = accel_deg_per_sec2;
                kf.decel_deg_per_sec2 = decel_deg_per_sec2;
                kf.tolerance_deg = tolerance_deg;
                kf.num_half_revs = num_half_revs;
                kf.use_shortest_dir = use_shortest_dir;
                kf.duration_ms = duration_ms;
                KeyFrame::TurnToRecordedHeading(kf)
            }
            RawKeyFrame::RobotAudio {
                trigger_time_ms,
                audio_event_id,
                volume,
                probability,
            } => {
                let n = audio_event_id.len();
                let probability = if probability.is_empty() {
                    vec![if n == 0 { 0.0 } else { 1.0 / n as f32 }; n]
                } else if probability.len() == n {
                    probability
                } else {
                    return Err(invalid(
                        anim,
                        "RobotAudio",
                        format!("{n} audio events but {} probabilities", probability.len()),
                    ));
                };
                let refs = audio_event_id
                    .into_iter()
                    .zip(probability)
                    .map(|(event_id, probability)| AudioRef {
                        event_id,
                        volume,
                        probability,
                    })
                    .collect();
                KeyFrame::RobotAudio(RobotAudioKeyFrame::new(trigger_time_ms, refs))
            }
            RawKeyFrame::FaceAnimation {
                trigger_time_ms,
                anim_name,
                frame_duration_ms,
                scanline_opacity,
            } => {
                let mut kf = FaceAnimationKeyFrame::new(trigger_time_ms, anim_name);
                kf.frame_duration_ms = frame_duration_ms;
                if let Some(opacity) = scanline_opacity {
                    kf.scanline_opacity = opacity;
                }
                KeyFrame::FaceAnimation(kf)
            }
            RawKeyFrame::ProceduralFace {
                trigger_time_ms,
                face_angle,
                face_center_x,
                face_center_y,
                face_scale_x,
                face_scale_y,
                scanline_opacity,
                left_eye,
                right_eye,
                duration_ms,
            } => {
                let mut face = ProceduralFace {
                    face_angle_deg: face_angle,
                    face_center: [face_center_x, face_center_y],
                    face_scale: [face_scale_x, face_scale_y],
                    left_eye: eye_from_array(anim, &left_eye)?,
                    right_eye: eye_from_array(anim, &right_eye)?,
                    ..ProceduralFace::default()
                };
                if let Some(opacity) = scanline_opacity {
                    face.scanline_opacity = opacity;
                }
                KeyFrame::ProceduralFace(
                    ProceduralFaceKeyFrame::new(trigger_time_ms, face).with_duration(duration_ms),
                )
            }
            RawKeyFrame::BackpackLights {
                trigger_time_ms,
                front,
                middle,
                back,
                left,
                right,
                duration_ms,
            } => {
                let zones = [front, middle, back, left, right].map(|[r, g, b]| Rgb::new(r, g, b));
                KeyFrame::BackpackLights(BackpackLightsKeyFrame::new(
                    trigger_time_ms,
                    BackpackLights { zones },
                    duration_ms,
                ))
            }
            RawKeyFrame::Event {
                trigger_time_ms,
                event_id,
            } => KeyFrame::Event(EventKeyFrame::new(trigger_time_ms, event_id)),
        };
        Ok(kf)
    }
}

fn invalid(anim: &str, track: &str, reason: String) -> StreamError {
    StreamError::InvalidKeyFrame {
        track: track.to_string(),
        reason: format!("{anim}: {reason}"),
    }
}

/// Eye parameters in declaration order; missing trailing values keep their
/// defaults.
fn eye_from_array(anim: &str, values: &[f32]) -> Result<EyeParams, StreamError> {
    let mut eye = EyeParams::default();
    let slots: [&mut f32; 14] = [
        &mut eye.center_x,
        &mut eye.center_y,
        &mut eye.scale_x,
        &mut eye.scale_y,
        &mut eye.angle_deg,
        &mut eye.upper_lid_y,
        &mut eye.upper_lid_angle_deg,
        &mut eye.upper_lid_bend,
        &mut eye.lower_lid_y,
        &mut eye.lower_lid_angle_deg,
        &mut eye.lower_lid_bend,
        &mut eye.saturation,
        &mut eye.lightness,
        &mut eye.glow_size,
    ];
    if values.len() > slots.len() {
        return Err(invalid(
            anim,
            "ProceduralFace",
            format!("{} eye parameters, at most {}", values.len(), slots.len()),
        ));
    }
    for (slot, v) in slots.into_iter().zip(values) {
        *slot = *v;
    }
    Ok(eye)
}

impl RawRadius {
    fn to_body_radius(&self, anim: &str) -> Result<BodyRadius, StreamError> {
        match self {
            RawRadius::Number(mm) => Ok(BodyRadius::Arc(
                (*mm).clamp(i16::MIN as i32, i16::MAX as i32) as i16,
            )),
            RawRadius::Text(s) => match s.as_str() {
                "TURN_IN_PLACE" | "POINT_TURN" => Ok(BodyRadius::PointTurn),
                "STRAIGHT" => Ok(BodyRadius::Straight),
                other => other
                    .parse::<i16>()
                    .map(BodyRadius::Arc)
                    .map_err(|_| invalid(anim, "BodyMotion", format!("bad radius '{other}'"))),
            },
        }
    }
}

// ----- JSON schema (serde) -----

fn one() -> f32 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(tag = "Name")]
enum RawKeyFrame {
    #[serde(rename = "HeadAngleKeyFrame")]
    HeadAngle {
        #[serde(rename = "triggerTime_ms")]
        trigger_time_ms: u32,
        angle_deg: i8,
        #[serde(rename = "angleVariability_deg", default)]
        angle_variability_deg: u8,
        #[serde(rename = "durationTime_ms", default)]
        duration_ms: u32,
    },
    #[serde(rename = "LiftHeightKeyFrame")]
    LiftHeight {
        #[serde(rename = "triggerTime_ms")]
        trigger_time_ms: u32,
        height_mm: u8,
        #[serde(rename = "heightVariability_mm", default)]
        height_variability_mm: u8,
        #[serde(rename = "durationTime_ms", default)]
        duration_ms: u32,
    },
    #[serde(rename = "BodyMotionKeyFrame")]
    BodyMotion {
        #[serde(rename = "triggerTime_ms")]
        trigger_time_ms: u32,
        speed: i16,
        radius_mm: RawRadius,
        #[serde(rename = "durationTime_ms", default)]
        duration_ms: u32,
    },
    #[serde(rename = "RecordHeadingKeyFrame")]
    RecordHeading {
        #[serde(rename = "triggerTime_ms")]
        trigger_time_ms: u32,
    },
    #[serde(rename = "TurnToRecordedHeadingKeyFrame")]
    TurnToRecordedHeading {
        #[serde(rename = "triggerTime_ms")]
        trigger_time_ms: u32,
        #[serde(default)]
        offset_deg: i16,
        #[serde(rename = "speed_degPerSec")]
        speed_deg_per_sec: i16,
        #[serde(rename = "accel_degPerSec2", default)]
        accel_deg_per_sec2: i16,
        #[serde(rename = "decel_degPerSec2", default)]
        decel_deg_per_sec2: i16,
        #[serde(default)]
        tolerance_deg: u16,
        #[serde(rename = "numHalfRevs", default)]
        num_half_revs: u16,
        #[serde(rename = "useShortestDir", default)]
        use_shortest_dir: bool,
        #[serde(rename = "durationTime_ms", default)]
        duration_ms: u32,
    },
    #[serde(rename = "RobotAudioKeyFrame")]
    RobotAudio {
        #[serde(rename = "triggerTime_ms")]
        trigger_time_ms: u32,
        #[serde(rename = "audioEventId")]
        audio_event_id: Vec<String>,
        #[serde(default = "one")]
        volume: f32,
        #[serde(default)]
        probability: Vec<f32>,
    },
    #[serde(rename = "FaceAnimationKeyFrame")]
    FaceAnimation {
        #[serde(rename = "triggerTime_ms")]
        trigger_time_ms: u32,
        #[serde(rename = "animName")]
        anim_name: String,
        #[serde(rename = "frameDuration_ms", default)]
        frame_duration_ms: Option<u32>,
        #[serde(rename = "scanlineOpacity", default)]
        scanline_opacity: Option<f32>,
    },
    #[serde(rename = "ProceduralFaceKeyFrame")]
    ProceduralFace {
        #[serde(rename = "triggerTime_ms")]
        trigger_time_ms: u32,
        #[serde(rename = "faceAngle", default)]
        face_angle: f32,
        #[serde(rename = "faceCenterX", default)]
        face_center_x: f32,
        #[serde(rename = "faceCenterY", default)]
        face_center_y: f32,
        #[serde(rename = "faceScaleX", default = "one")]
        face_scale_x: f32,
        #[serde(rename = "faceScaleY", default = "one")]
        face_scale_y: f32,
        #[serde(rename = "scanlineOpacity", default)]
        scanline_opacity: Option<f32>,
        #[serde(rename = "leftEye", default)]
        left_eye: Vec<f32>,
        #[serde(rename = "rightEye", default)]
        right_eye: Vec<f32>,
        #[serde(rename = "durationTime_ms", default)]
        duration_ms: u32,
    },
    #[serde(rename = "BackpackLightsKeyFrame")]
    BackpackLights {
        #[serde(rename = "triggerTime_ms")]
        trigger_time_ms: u32,
        #[serde(rename = "Front", default)]
        front: [f32; 3],
        #[serde(rename = "Middle", default)]
        middle: [f32; 3],
        #[serde(rename = "Back", default)]
        back: [f32; 3],
        #[serde(rename = "Left", default)]
        left: [f32; 3],
        #[serde(rename = "Right", default)]
        right: [f32; 3],
        #[serde(rename = "durationTime_ms", default)]
        duration_ms: u32,
    },
    #[serde(rename = "EventKeyFrame")]
    Event {
        #[serde(rename = "triggerTime_ms")]
        trigger_time_ms: u32,
        event_id: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRadius {
    Number(i32),
    Text(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "spin": [
            { "Name": "EventKeyFrame", "triggerTime_ms": 400, "event_id": "done" },
            { "Name": "BodyMotionKeyFrame", "triggerTime_ms": 0, "speed": 90,
              "radius_mm": "TURN_IN_PLACE", "durationTime_ms": 300 },
            { "Name": "RobotAudioKeyFrame", "triggerTime_ms": 0,
              "audioEventId": ["a", "b"], "probability": [0.25, 0.75] },
            { "Name": "ProceduralFaceKeyFrame", "triggerTime_ms": 0,
              "leftEye": [1, 2, 1, 0.5], "faceScaleX": 1.2 }
        ],
        "nod": [
            { "Name": "HeadAngleKeyFrame", "triggerTime_ms": 0, "angle_deg": -10,
              "durationTime_ms": 100 }
        ]
    }"#;

    #[test]
    fn parses_multiple_animations() {
        let anims = parse_animations_json(DOC).unwrap();
        let names: Vec<_> = anims.iter().map(Animation::name).collect();
        assert_eq!(names, ["nod", "spin"]);

        let spin = &anims[1];
        let body = spin.body_motion.current().unwrap();
        assert_eq!(body.curvature_radius_mm, 0);
        assert!((body.speed - 90f32.to_radians()).abs() < 1e-5);

        let audio = spin.robot_audio.current().unwrap();
        assert_eq!(audio.audio_refs.len(), 2);
        assert_eq!(audio.audio_refs[1].probability, 0.75);

        let face = &spin.procedural_face.current().unwrap().face;
        assert_eq!(face.left_eye.center_x, 1.0);
        assert_eq!(face.left_eye.scale_y, 0.5);
        assert_eq!(face.right_eye, EyeParams::default());
        assert_eq!(face.face_scale, [1.2, 1.0]);
        assert_eq!(spin.last_keyframe_time_ms(), 400);
    }

    #[test]
    fn radius_forms() {
        let doc = r#"{ "a": [
            { "Name": "BodyMotionKeyFrame", "triggerTime_ms": 0, "speed": 500, "radius_mm": "STRAIGHT" },
            { "Name": "BodyMotionKeyFrame", "triggerTime_ms": 10, "speed": 50, "radius_mm": 120 },
            { "Name": "BodyMotionKeyFrame", "triggerTime_ms": 20, "speed": 50, "radius_mm": "-80" }
        ] }"#;
        let anim = &parse_animations_json(doc).unwrap()[0];
        let radii: Vec<_> = anim.body_motion.iter().map(|k| k.curvature_radius_mm).collect();
        assert_eq!(radii, [i16::MAX, 120, -80]);
        assert_eq!(anim.body_motion.current().unwrap().speed, 220.0);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            parse_animations_json("not json"),
            Err(StreamError::Parse { .. })
        ));
        let bad_radius = r#"{ "a": [ { "Name": "BodyMotionKeyFrame", "triggerTime_ms": 0,
            "speed": 1, "radius_mm": "SIDEWAYS" } ] }"#;
        assert!(matches!(
            parse_animations_json(bad_radius),
            Err(StreamError::InvalidKeyFrame { .. })
        ));
        let mismatched = r#"{ "a": [ { "Name": "RobotAudioKeyFrame", "triggerTime_ms": 0,
            "audioEventId": ["x"], "probability": [0.5, 0.5] } ] }"#;
        assert!(parse_animations_json(mismatched).is_err());
    }

    #[test]
    fn library_lookup() {
        let mut lib = AnimationLibrary::new();
        assert_eq!(lib.load_json(DOC).unwrap(), 2);
        assert!(lib.contains("nod"));
        assert!(AnimationLoader::get_animation(&lib, "spin").is_some());
        assert!(lib.get_animation("missing").is_none());
        assert_eq!(lib.len(), 2);
    }
}
