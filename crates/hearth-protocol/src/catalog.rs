//! Property payload shapes for the command catalog (spec.md §4.6), including
//! the audio/night-light shapes found only in the fuller "arlo baby" draft
//! of the original source (`arlobaby.go`), not the distilled spec.
//!
//! Every struct here is `{action, resource}`-agnostic — it's just the
//! `properties` object nested inside a [`crate::NotifyPayload`]. Callers in
//! `hearth-client` build the surrounding payload.

use serde::Serialize;

/// `properties` for base-station mode operations (`Arm`/`Disarm`/`SetCustomMode`).
#[derive(Debug, Clone, Serialize)]
pub struct ModeProperties {
    #[serde(rename = "active")]
    pub active: String,
}

/// `properties` for `GetAssociatedCamerasState`/subscription pings.
#[derive(Debug, Clone, Serialize)]
pub struct DevicesProperties {
    pub devices: Vec<String>,
}

/// `properties` for `SetBrightness`.
#[derive(Debug, Clone, Serialize)]
pub struct BrightnessProperties {
    pub brightness: i32,
}

/// `properties` for `EnableMotionAlerts`/`DisableMotionAlerts`.
#[derive(Debug, Clone, Serialize)]
pub struct MotionAlertProperties {
    #[serde(rename = "motionDetectionSensitivity")]
    pub motion_detection_sensitivity: Option<i32>,
    pub enabled: bool,
}

/// Volume + mute, nested under `speaker` (grounded on `arlobaby.go::SetVolume`).
#[derive(Debug, Clone, Serialize)]
pub struct SpeakerProperties {
    pub speaker: VolumeProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct VolumeProperties {
    pub mute: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<i32>,
}

/// `properties` for `Play` (`playTrack` action).
#[derive(Debug, Clone, Serialize)]
pub struct PlayTrackProperties {
    #[serde(rename = "trackId")]
    pub track_id: String,
    pub position: i32,
}

/// Shuffle toggle, nested under `config`.
#[derive(Debug, Clone, Serialize)]
pub struct ShuffleProperties {
    pub config: BaseShuffleProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct BaseShuffleProperties {
    #[serde(rename = "shuffleActive")]
    pub shuffle_active: bool,
}

/// Loopback (continuous/singleTrack) mode, nested under `config`.
#[derive(Debug, Clone, Serialize)]
pub struct LoopbackModeProperties {
    pub config: BaseLoopbackModeProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct BaseLoopbackModeProperties {
    #[serde(rename = "loopbackMode")]
    pub loopback_mode: String,
}

/// Sleep timer config, nested under `config`.
#[derive(Debug, Clone, Serialize)]
pub struct SleepTimerProperties {
    pub config: BaseSleepTimerProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct BaseSleepTimerProperties {
    #[serde(rename = "sleepTime")]
    pub sleep_time: i64,
    #[serde(rename = "sleepTimeRel")]
    pub sleep_time_rel: i32,
}

/// Night-light state, nested under `nightLight`.
#[derive(Debug, Clone, Serialize, Default)]
pub struct NightLightProperties {
    #[serde(rename = "nightLight")]
    pub night_light: BaseNightLightProperties,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct BaseNightLightProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rgb: Option<NightLightRgbProperties>,
    #[serde(rename = "sleepTime", skip_serializing_if = "Option::is_none")]
    pub sleep_time: Option<i64>,
    #[serde(rename = "sleepTimeRel", skip_serializing_if = "Option::is_none")]
    pub sleep_time_rel: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NightLightRgbProperties {
    pub red: i32,
    pub blue: i32,
    pub green: i32,
}

/// Valid `SetNightLightMode` values (spec.md §8 boundary behavior).
pub const NIGHT_LIGHT_MODES: &[&str] = &["rainbow", "rgb"];

// ---------------------------------------------------------------------------
// Value clamping (spec.md §4.6, §8)
// ---------------------------------------------------------------------------

/// Clamp a brightness value to `[-2, 2]`.
#[must_use]
pub fn clamp_brightness(value: i32) -> i32 {
    value.clamp(-2, 2)
}

/// Clamp an RGB component to `[0, 255]`.
#[must_use]
pub fn clamp_rgb(value: i32) -> i32 {
    value.clamp(0, 255)
}

/// Clamp a track playback position to `>= 0`.
#[must_use]
pub fn clamp_position(value: i32) -> i32 {
    value.max(0)
}

/// Default `sleepTime`: 300ms past `now_ms` when the caller passes 0 / unspecified.
#[must_use]
pub fn default_sleep_time(now_ms: i64, requested: i64) -> i64 {
    if requested == 0 {
        300 + now_ms
    } else {
        requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_clamps_to_range() {
        assert_eq!(clamp_brightness(-3), -2);
        assert_eq!(clamp_brightness(3), 2);
        assert_eq!(clamp_brightness(0), 0);
    }

    #[test]
    fn rgb_clamps_to_range() {
        assert_eq!(clamp_rgb(-5), 0);
        assert_eq!(clamp_rgb(300), 255);
        assert_eq!(clamp_rgb(128), 128);
    }

    #[test]
    fn position_clamps_to_non_negative() {
        assert_eq!(clamp_position(-10), 0);
        assert_eq!(clamp_position(42), 42);
    }

    #[test]
    fn default_sleep_time_uses_now_plus_300_when_unspecified() {
        assert_eq!(default_sleep_time(1_000_000, 0), 1_000_300);
    }

    #[test]
    fn default_sleep_time_preserves_explicit_value() {
        assert_eq!(default_sleep_time(1_000_000, 42), 42);
    }
}
