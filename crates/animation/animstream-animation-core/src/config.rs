//! Core configuration for animstream-animation-core.

use serde::{Deserialize, Serialize};

use crate::error::StreamError;

/// Blink spacing above this risks screen burn-in; larger values are clamped.
pub const MAX_BLINK_SPACING_FOR_SCREEN_PROTECTION_MS: u32 = 30_000;

/// Every tunable of the streamer and the procedural layers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fixed animation period; all streaming time advances in these steps.
    pub tick_ms: u32,
    /// Emit an AnimationState heartbeat every this many ticks.
    pub state_report_period_ticks: u32,
    /// Idle time after the last streamed tick before the neutral face is
    /// restored and keep-alive starts.
    pub idle_timeout_ms: u32,
    /// After an authored face image is drawn, hold off procedural faces for
    /// this many ticks.
    pub min_ticks_between_authored_and_procedural_face: u32,
    /// Grace duration used when a new session discards keep-alive effects.
    pub keep_alive_removal_grace_ticks: u32,
    /// Upper bound on how long end-of-animation waits for audio to finish.
    pub audio_end_grace_ticks: u32,
    /// Played (internally) after an interrupt left nothing streaming.
    pub neutral_animation: String,
    pub enable_keep_face_alive: bool,
    pub keep_alive: KeepAliveParams,
    /// Seed for the engine RNG; entropy when absent.
    pub random_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_ms: 33,
            state_report_period_ticks: 2,
            idle_timeout_ms: 500,
            min_ticks_between_authored_and_procedural_face: 2,
            keep_alive_removal_grace_ticks: 3,
            audio_end_grace_ticks: 30,
            neutral_animation: "anim_neutral_eyes_01".to_string(),
            enable_keep_face_alive: true,
            keep_alive: KeepAliveParams::default(),
            random_seed: None,
        }
    }
}

impl Config {
    pub fn from_json_str(s: &str) -> Result<Self, StreamError> {
        serde_json::from_str(s).map_err(|e| StreamError::Parse {
            reason: format!("config: {e}"),
        })
    }

    #[inline]
    pub fn ticks_to_ms(&self, ticks: u32) -> u32 {
        ticks.saturating_mul(self.tick_ms)
    }
}

/// Parameters of the ambient keep-alive face behavior.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepAliveParams {
    pub blink_spacing_min_ms: u32,
    pub blink_spacing_max_ms: u32,
    pub eye_dart_spacing_min_ms: u32,
    pub eye_dart_spacing_max_ms: u32,
    pub eye_dart_max_distance_px: f32,
    pub eye_dart_min_duration_ms: u32,
    pub eye_dart_max_duration_ms: u32,
    pub eye_dart_outer_eye_scale_increase: f32,
    pub eye_dart_up_max_scale: f32,
    pub eye_dart_down_min_scale: f32,
}

impl Default for KeepAliveParams {
    fn default() -> Self {
        Self {
            blink_spacing_min_ms: 3000,
            blink_spacing_max_ms: 4000,
            eye_dart_spacing_min_ms: 250,
            eye_dart_spacing_max_ms: 1000,
            eye_dart_max_distance_px: 6.0,
            eye_dart_min_duration_ms: 50,
            eye_dart_max_duration_ms: 200,
            eye_dart_outer_eye_scale_increase: 0.1,
            eye_dart_up_max_scale: 1.1,
            eye_dart_down_min_scale: 0.85,
        }
    }
}

/// Names one keep-alive parameter for runtime tuning.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeepAliveParam {
    BlinkSpacingMinMs,
    BlinkSpacingMaxMs,
    EyeDartSpacingMinMs,
    EyeDartSpacingMaxMs,
    EyeDartMaxDistancePx,
    EyeDartMinDurationMs,
    EyeDartMaxDurationMs,
    EyeDartOuterEyeScaleIncrease,
    EyeDartUpMaxScale,
    EyeDartDownMinScale,
}

impl KeepAliveParam {
    /// Timing parameters reset the keep-alive timers when changed.
    #[inline]
    pub fn is_timing(&self) -> bool {
        matches!(
            self,
            Self::BlinkSpacingMinMs
                | Self::BlinkSpacingMaxMs
                | Self::EyeDartSpacingMinMs
                | Self::EyeDartSpacingMaxMs
                | Self::EyeDartMinDurationMs
                | Self::EyeDartMaxDurationMs
        )
    }
}

fn ms(value: f32) -> u32 {
    value.max(0.0).round() as u32
}

impl KeepAliveParams {
    pub fn get(&self, param: KeepAliveParam) -> f32 {
        match param {
            KeepAliveParam::BlinkSpacingMinMs => self.blink_spacing_min_ms as f32,
            KeepAliveParam::BlinkSpacingMaxMs => self.blink_spacing_max_ms as f32,
            KeepAliveParam::EyeDartSpacingMinMs => self.eye_dart_spacing_min_ms as f32,
            KeepAliveParam::EyeDartSpacingMaxMs => self.eye_dart_spacing_max_ms as f32,
            KeepAliveParam::EyeDartMaxDistancePx => self.eye_dart_max_distance_px,
            KeepAliveParam::EyeDartMinDurationMs => self.eye_dart_min_duration_ms as f32,
            KeepAliveParam::EyeDartMaxDurationMs => self.eye_dart_max_duration_ms as f32,
            KeepAliveParam::EyeDartOuterEyeScaleIncrease => self.eye_dart_outer_eye_scale_increase,
            KeepAliveParam::EyeDartUpMaxScale => self.eye_dart_up_max_scale,
            KeepAliveParam::EyeDartDownMinScale => self.eye_dart_down_min_scale,
        }
    }

    /// Set one parameter. Blink spacing max is clamped to the screen-protection
    /// limit.
    pub fn set(&mut self, param: KeepAliveParam, value: f32) {
        match param {
            KeepAliveParam::BlinkSpacingMinMs => self.blink_spacing_min_ms = ms(value),
            KeepAliveParam::BlinkSpacingMaxMs => {
                let mut v = ms(value);
                if v > MAX_BLINK_SPACING_FOR_SCREEN_PROTECTION_MS {
                    log::warn!(
                        "KeepAliveParams.Set: blink spacing max {v}ms exceeds screen protection limit, using {MAX_BLINK_SPACING_FOR_SCREEN_PROTECTION_MS}ms"
                    );
                    v = MAX_BLINK_SPACING_FOR_SCREEN_PROTECTION_MS;
                }
                self.blink_spacing_max_ms = v;
            }
            KeepAliveParam::EyeDartSpacingMinMs => self.eye_dart_spacing_min_ms = ms(value),
            KeepAliveParam::EyeDartSpacingMaxMs => self.eye_dart_spacing_max_ms = ms(value),
            KeepAliveParam::EyeDartMaxDistancePx => self.eye_dart_max_distance_px = value,
            KeepAliveParam::EyeDartMinDurationMs => self.eye_dart_min_duration_ms = ms(value),
            KeepAliveParam::EyeDartMaxDurationMs => self.eye_dart_max_duration_ms = ms(value),
            KeepAliveParam::EyeDartOuterEyeScaleIncrease => {
                self.eye_dart_outer_eye_scale_increase = value
            }
            KeepAliveParam::EyeDartUpMaxScale => self.eye_dart_up_max_scale = value,
            KeepAliveParam::EyeDartDownMinScale => self.eye_dart_down_min_scale = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = Config::from_json_str(r#"{ "tick_ms": 30, "keep_alive": { "blink_spacing_min_ms": 100 } }"#)
            .unwrap();
        assert_eq!(cfg.tick_ms, 30);
        assert_eq!(cfg.idle_timeout_ms, 500);
        assert_eq!(cfg.keep_alive.blink_spacing_min_ms, 100);
        assert_eq!(cfg.keep_alive.blink_spacing_max_ms, 4000);
    }

    #[test]
    fn bad_json_is_parse_error() {
        assert!(matches!(
            Config::from_json_str("{ nope"),
            Err(StreamError::Parse { .. })
        ));
    }

    #[test]
    fn blink_max_is_clamped() {
        let mut p = KeepAliveParams::default();
        p.set(KeepAliveParam::BlinkSpacingMaxMs, 90_000.0);
        assert_eq!(p.blink_spacing_max_ms, MAX_BLINK_SPACING_FOR_SCREEN_PROTECTION_MS);
        p.set(KeepAliveParam::EyeDartMaxDistancePx, 2.5);
        assert_eq!(p.get(KeepAliveParam::EyeDartMaxDistancePx), 2.5);
        assert!(KeepAliveParam::EyeDartSpacingMaxMs.is_timing());
        assert!(!KeepAliveParam::EyeDartUpMaxScale.is_timing());
    }
}
