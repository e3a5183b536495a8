//! Command catalog (spec.md §4.6): one thin method per operation, each
//! building a [`NotifyPayload`] and submitting it through `Request`.
//!
//! Base-station mode/siren/rules methods are grounded on the
//! `action="get"|"set", resource="basestation"` shape in
//! `examples/original_source/basestation.go::GetState`, extrapolated to the
//! sibling operations spec.md §4.6 names but the retrieved source doesn't
//! spell out field-by-field (mode/siren/rules/schedule) — see DESIGN.md.
//! Audio/night-light methods on `AudioCamera` are grounded directly on
//! `examples/original_source/arlobaby.go`, action/resource/property shapes
//! preserved as-is. `On/Off/SetBrightness/*Alerts` on `Camera` extrapolate
//! the same `cameras/<id>` resource convention `StartStream` uses.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::json;

use hearth_protocol::catalog::{
    BaseLoopbackModeProperties, BaseNightLightProperties, BaseShuffleProperties,
    BaseSleepTimerProperties, LoopbackModeProperties, NightLightProperties,
    NightLightRgbProperties, PlayTrackProperties, ShuffleProperties, SleepTimerProperties,
    SpeakerProperties, VolumeProperties, clamp_brightness, clamp_position, clamp_rgb,
    default_sleep_time, NIGHT_LIGHT_MODES,
};
use hearth_protocol::{EventEnvelope, StreamData, StreamResponse};

use crate::device_handle::{AudioCamera, BaseStation, Camera};
use crate::error::{HttpError, RequestError};
use crate::trans_id::gen_trans_id;

const DEFAULT_TRACK_ID: &str = "2391d620-e491-4412-99f6-e9a40d6046ed";

// ---------------------------------------------------------------------------
// Base station catalog
// ---------------------------------------------------------------------------

impl BaseStation {
    /// Arm the base station with the given mode id.
    pub async fn arm(&self, mode_id: &str) -> Result<EventEnvelope, RequestError> {
        self.set_active_mode(mode_id).await
    }

    /// Disarm — sets the well-known "disarmed" mode id.
    pub async fn disarm(&self) -> Result<EventEnvelope, RequestError> {
        self.set_active_mode("mode0").await
    }

    /// Activate any mode by id (arm/disarm are thin wrappers over this).
    pub async fn set_custom_mode(&self, mode_id: &str) -> Result<EventEnvelope, RequestError> {
        self.set_active_mode(mode_id).await
    }

    async fn set_active_mode(&self, mode_id: &str) -> Result<EventEnvelope, RequestError> {
        let payload = self.notify_payload(
            "set",
            "modes",
            true,
            json!({ "active": mode_id }),
        );
        self.request(payload).await
    }

    pub async fn delete_mode(&self, mode_id: &str) -> Result<EventEnvelope, RequestError> {
        let payload = self.notify_payload(
            "delete",
            format!("modes/{mode_id}"),
            true,
            serde_json::Value::Null,
        );
        self.request(payload).await
    }

    pub async fn get_modes(&self) -> Result<EventEnvelope, RequestError> {
        let payload = self.notify_payload("get", "modes", false, serde_json::Value::Null);
        self.request(payload).await
    }

    /// Grounded exactly on `basestation.go::GetState`.
    pub async fn get_state(&self) -> Result<EventEnvelope, RequestError> {
        let payload = self.notify_payload("get", "basestation", false, serde_json::Value::Null);
        self.request(payload).await
    }

    pub async fn get_associated_cameras_state(&self) -> Result<EventEnvelope, RequestError> {
        let payload = self.notify_payload("get", "cameras", false, serde_json::Value::Null);
        self.request(payload).await
    }

    pub async fn get_rules(&self) -> Result<EventEnvelope, RequestError> {
        let payload = self.notify_payload("get", "rules", false, serde_json::Value::Null);
        self.request(payload).await
    }

    pub async fn get_calendar_mode(&self) -> Result<EventEnvelope, RequestError> {
        let payload = self.notify_payload("get", "schedule", false, serde_json::Value::Null);
        self.request(payload).await
    }

    pub async fn set_calendar_mode(&self, active: bool) -> Result<EventEnvelope, RequestError> {
        let payload = self.notify_payload(
            "set",
            "schedule",
            true,
            json!({ "active": active }),
        );
        self.request(payload).await
    }

    pub async fn siren_on(&self) -> Result<EventEnvelope, RequestError> {
        self.set_siren("on").await
    }

    pub async fn siren_off(&self) -> Result<EventEnvelope, RequestError> {
        self.set_siren("off").await
    }

    async fn set_siren(&self, state: &str) -> Result<EventEnvelope, RequestError> {
        let payload = self.notify_payload(
            "set",
            "siren",
            true,
            json!({ "sirenState": state }),
        );
        self.request(payload).await
    }
}

// ---------------------------------------------------------------------------
// Camera catalog
// ---------------------------------------------------------------------------

impl Camera {
    pub async fn on(&self) -> Result<EventEnvelope, RequestError> {
        self.set_privacy_active(false).await
    }

    pub async fn off(&self) -> Result<EventEnvelope, RequestError> {
        self.set_privacy_active(true).await
    }

    async fn set_privacy_active(&self, privacy_active: bool) -> Result<EventEnvelope, RequestError> {
        let payload = self.notify_payload(
            "set",
            format!("cameras/{}", self.device_id()),
            true,
            json!({ "privacyActive": privacy_active }),
        );
        self.request(payload).await
    }

    /// Brightness is clamped to `[-2, 2]` (spec.md §4.6/§8).
    pub async fn set_brightness(&self, brightness: i32) -> Result<EventEnvelope, RequestError> {
        let payload = self.notify_payload(
            "set",
            format!("cameras/{}", self.device_id()),
            true,
            json!({ "brightness": clamp_brightness(brightness) }),
        );
        self.request(payload).await
    }

    pub async fn enable_motion_alerts(
        &self,
        sensitivity: Option<i32>,
    ) -> Result<EventEnvelope, RequestError> {
        self.set_motion_alerts(true, sensitivity).await
    }

    pub async fn disable_motion_alerts(&self) -> Result<EventEnvelope, RequestError> {
        self.set_motion_alerts(false, None).await
    }

    async fn set_motion_alerts(
        &self,
        enabled: bool,
        sensitivity: Option<i32>,
    ) -> Result<EventEnvelope, RequestError> {
        let payload = self.notify_payload(
            "set",
            format!("cameras/{}", self.device_id()),
            true,
            json!({ "motionDetection": { "enabled": enabled, "sensitivity": sensitivity } }),
        );
        self.request(payload).await
    }

    pub async fn enable_audio_alerts(
        &self,
        sensitivity: Option<i32>,
    ) -> Result<EventEnvelope, RequestError> {
        self.set_audio_alerts(true, sensitivity).await
    }

    pub async fn disable_audio_alerts(&self) -> Result<EventEnvelope, RequestError> {
        self.set_audio_alerts(false, None).await
    }

    async fn set_audio_alerts(
        &self,
        enabled: bool,
        sensitivity: Option<i32>,
    ) -> Result<EventEnvelope, RequestError> {
        let payload = self.notify_payload(
            "set",
            format!("cameras/{}", self.device_id()),
            true,
            json!({ "audioDetection": { "enabled": enabled, "sensitivity": sensitivity } }),
        );
        self.request(payload).await
    }

    pub async fn set_alert_notification_methods(
        &self,
        push: bool,
        email: bool,
    ) -> Result<EventEnvelope, RequestError> {
        let payload = self.notify_payload(
            "set",
            format!("cameras/{}", self.device_id()),
            true,
            json!({ "alertNotificationMethod": { "push": push, "email": email } }),
        );
        self.request(payload).await
    }

    /// Returns the stream URL with its `rtsp://` prefix rewritten to
    /// `rtsps://` (spec.md §4.6). Goes through plain REST, not the event
    /// stream — grounded on `camera.go::StartStream`.
    pub async fn start_stream(&self) -> Result<StreamData, RequestError> {
        let trans_id = gen_trans_id();
        let body = json!({
            "action": "set",
            "resource": format!("cameras/{}", self.device_id()),
            "publishResponse": true,
            "properties": { "activityState": "startUserStream", "cameraId": self.device_id() },
            "transId": trans_id,
            "from": format!("{}_web", self.device().user_id),
            "to": self.parent_id(),
        });
        let mut stream_data = self
            .post_rest::<StreamResponse>("users/devices/startStream", &body)
            .await?;
        stream_data.url = stream_data.url.replacen("rtsp://", "rtsps://", 1);
        Ok(stream_data)
    }

    /// `StartStream` then POST to the plain take-snapshot endpoint
    /// (grounded on `camera.go::TakeSnapshot` — a composed two-step). Does
    /// not wait for the asynchronous snapshot-ready event: the source never
    /// defines that event's `resource` string, so `SubscriptionTable`'s
    /// `(from, resource)` axis is left available for callers who know their
    /// server's convention rather than guessing one here.
    pub async fn take_snapshot(&self) -> Result<StreamData, RequestError> {
        let stream_data = self.start_stream().await?;
        let body = self.device_admin_body();
        self.post_rest_ignore_body("users/devices/takeSnapshot", &body)
            .await?;
        Ok(stream_data)
    }

    /// `StartStream` then POST to the plain start-recording endpoint
    /// (grounded on `camera.go::StartRecording`).
    pub async fn start_recording(&self) -> Result<StreamData, RequestError> {
        let stream_data = self.start_stream().await?;
        let body = self.device_admin_body();
        self.post_rest_ignore_body("users/devices/startRecord", &body)
            .await?;
        Ok(stream_data)
    }

    /// Plain REST POST (grounded on `arlo.go`'s `StopRecording` pseudocode).
    pub async fn stop_recording(&self) -> Result<(), RequestError> {
        let body = self.device_admin_body();
        self.post_rest_ignore_body("users/devices/stopRecord", &body)
            .await
    }

    fn device_admin_body(&self) -> serde_json::Value {
        let olson_time_zone = self
            .device()
            .properties
            .get("olsonTimeZone")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        json!({
            "deviceId": self.device_id(),
            "parentId": self.parent_id(),
            "xcloudId": self.device().x_cloud_id,
            "olsonTimeZone": olson_time_zone,
        })
    }

    async fn post_rest<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, RequestError>
    where
        T: IntoStreamData,
    {
        let session = self.session_or_not_connected()?;
        let http = session.http();
        let extra = self.xcloud_header()?;
        let response: T = http
            .post(path, body, Some(extra))
            .await
            .map_err(RequestError::Http)?;
        response.into_stream_data()
    }

    async fn post_rest_ignore_body(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<(), RequestError> {
        let session = self.session_or_not_connected()?;
        let http = session.http();
        let extra = self.xcloud_header()?;
        let _: serde_json::Value = http
            .post(path, body, Some(extra))
            .await
            .map_err(RequestError::Http)?;
        Ok(())
    }

    fn session_or_not_connected(&self) -> Result<std::sync::Arc<crate::session::Session>, RequestError> {
        self.session().ok_or(RequestError::NotConnected)
    }

    fn xcloud_header(&self) -> Result<HeaderMap, RequestError> {
        let mut extra = HeaderMap::new();
        extra.insert(
            HeaderName::from_static("xcloudid"),
            HeaderValue::from_str(&self.device().x_cloud_id)
                .map_err(|e| RequestError::Http(HttpError::Decode(e.to_string())))?,
        );
        Ok(extra)
    }
}

/// Adapter so `post_rest` can validate `{success: false}` bodies uniformly
/// and hand back the `StreamData` payload `start_stream` needs.
trait IntoStreamData {
    fn into_stream_data(self) -> Result<StreamData, RequestError>;
}

impl IntoStreamData for StreamResponse {
    fn into_stream_data(self) -> Result<StreamData, RequestError> {
        if !self.success {
            return Err(RequestError::Service(
                self.error_text().unwrap_or("startStream failed").to_owned(),
            ));
        }
        self.data
            .ok_or_else(|| RequestError::Service("startStream succeeded with no data".to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Audio-capable camera catalog (grounded on arlobaby.go)
// ---------------------------------------------------------------------------

impl AudioCamera {
    pub async fn set_volume(&self, volume: i32) -> Result<EventEnvelope, RequestError> {
        let properties = serde_json::to_value(SpeakerProperties {
            speaker: VolumeProperties {
                mute: false,
                volume: Some(volume),
            },
        })
        .expect("SpeakerProperties always serializes");
        let payload = self.notify_payload(
            "set",
            format!("cameras/{}", self.device_id()),
            true,
            properties,
        );
        self.request(payload).await
    }

    pub async fn mute(&self) -> Result<EventEnvelope, RequestError> {
        self.set_mute(true).await
    }

    pub async fn unmute(&self) -> Result<EventEnvelope, RequestError> {
        self.set_mute(false).await
    }

    async fn set_mute(&self, mute: bool) -> Result<EventEnvelope, RequestError> {
        let properties = serde_json::to_value(SpeakerProperties {
            speaker: VolumeProperties { mute, volume: None },
        })
        .expect("SpeakerProperties always serializes");
        let payload = self.notify_payload(
            "set",
            format!("cameras/{}", self.device_id()),
            true,
            properties,
        );
        self.request(payload).await
    }

    pub async fn play(&self, track_id: Option<String>, position: i32) -> Result<EventEnvelope, RequestError> {
        let properties = serde_json::to_value(PlayTrackProperties {
            track_id: track_id.unwrap_or_else(|| DEFAULT_TRACK_ID.to_owned()),
            position: clamp_position(position),
        })
        .expect("PlayTrackProperties always serializes");
        let payload = self.notify_payload("playTrack", "audioPlayback/player", false, properties);
        self.request(payload).await
    }

    pub async fn pause(&self) -> Result<EventEnvelope, RequestError> {
        let payload = self.notify_payload(
            "pause",
            "audioPlayback/player",
            false,
            serde_json::Value::Null,
        );
        self.request(payload).await
    }

    pub async fn next(&self) -> Result<EventEnvelope, RequestError> {
        let payload = self.notify_payload(
            "nextTrack",
            "audioPlayback/player",
            false,
            serde_json::Value::Null,
        );
        self.request(payload).await
    }

    pub async fn shuffle(&self, on: bool) -> Result<EventEnvelope, RequestError> {
        let properties = serde_json::to_value(ShuffleProperties {
            config: BaseShuffleProperties { shuffle_active: on },
        })
        .expect("ShuffleProperties always serializes");
        let payload = self.notify_payload("set", "audioPlayback/config", true, properties);
        self.request(payload).await
    }

    pub async fn set_loop_back_mode(&self, loopback_mode: &str) -> Result<EventEnvelope, RequestError> {
        let properties = serde_json::to_value(LoopbackModeProperties {
            config: BaseLoopbackModeProperties {
                loopback_mode: loopback_mode.to_owned(),
            },
        })
        .expect("LoopbackModeProperties always serializes");
        let payload = self.notify_payload("set", "audioPlayback/config", true, properties);
        self.request(payload).await
    }

    pub async fn get_audio_playback(&self) -> Result<EventEnvelope, RequestError> {
        let payload = self.notify_payload(
            "get",
            "audioPlayback",
            false,
            serde_json::Value::Null,
        );
        self.request(payload).await
    }

    /// `sleep_time == 0` defaults to 300ms past "now" (spec.md §4.6/§8).
    pub async fn enable_sleep_timer(
        &self,
        sleep_time_ms: i64,
        sleep_time_rel: i32,
    ) -> Result<EventEnvelope, RequestError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let properties = serde_json::to_value(SleepTimerProperties {
            config: BaseSleepTimerProperties {
                sleep_time: default_sleep_time(now_ms, sleep_time_ms),
                sleep_time_rel,
            },
        })
        .expect("SleepTimerProperties always serializes");
        let payload = self.notify_payload("set", "audioPlayback/config", true, properties);
        self.request(payload).await
    }

    pub async fn disable_sleep_timer(&self, sleep_time_rel: i32) -> Result<EventEnvelope, RequestError> {
        let sleep_time_rel = if sleep_time_rel == 0 { 300 } else { sleep_time_rel };
        let properties = serde_json::to_value(SleepTimerProperties {
            config: BaseSleepTimerProperties {
                sleep_time: 0,
                sleep_time_rel,
            },
        })
        .expect("SleepTimerProperties always serializes");
        let payload = self.notify_payload("set", "audioPlayback/config", true, properties);
        self.request(payload).await
    }

    pub async fn night_light(&self, on: bool) -> Result<EventEnvelope, RequestError> {
        self.set_night_light(BaseNightLightProperties {
            enabled: Some(on),
            ..Default::default()
        })
        .await
    }

    pub async fn set_night_light_brightness(&self, level: i32) -> Result<EventEnvelope, RequestError> {
        self.set_night_light(BaseNightLightProperties {
            brightness: Some(clamp_brightness(level)),
            ..Default::default()
        })
        .await
    }

    /// Rejects a mode outside `{"rainbow", "rgb"}` with `InvalidArgument`
    /// without issuing a request (spec.md §8 boundary behavior).
    pub async fn set_night_light_mode(&self, mode: &str) -> Result<EventEnvelope, RequestError> {
        if !NIGHT_LIGHT_MODES.contains(&mode) {
            return Err(RequestError::InvalidArgument(format!(
                "night light mode must be one of {NIGHT_LIGHT_MODES:?}, got {mode:?}"
            )));
        }
        self.set_night_light(BaseNightLightProperties {
            mode: Some(mode.to_owned()),
            ..Default::default()
        })
        .await
    }

    pub async fn set_night_light_color(&self, red: i32, blue: i32, green: i32) -> Result<EventEnvelope, RequestError> {
        self.set_night_light(BaseNightLightProperties {
            rgb: Some(NightLightRgbProperties {
                red: clamp_rgb(red),
                blue: clamp_rgb(blue),
                green: clamp_rgb(green),
            }),
            ..Default::default()
        })
        .await
    }

    pub async fn enable_night_light_timer(
        &self,
        sleep_time_ms: i64,
        sleep_time_rel: i32,
    ) -> Result<EventEnvelope, RequestError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        self.set_night_light(BaseNightLightProperties {
            sleep_time: Some(default_sleep_time(now_ms, sleep_time_ms)),
            sleep_time_rel: Some(sleep_time_rel),
            ..Default::default()
        })
        .await
    }

    pub async fn disable_night_light_timer(&self, sleep_time_rel: i32) -> Result<EventEnvelope, RequestError> {
        let sleep_time_rel = if sleep_time_rel == 0 { 300 } else { sleep_time_rel };
        self.set_night_light(BaseNightLightProperties {
            sleep_time: Some(0),
            sleep_time_rel: Some(sleep_time_rel),
            ..Default::default()
        })
        .await
    }

    async fn set_night_light(
        &self,
        night_light: BaseNightLightProperties,
    ) -> Result<EventEnvelope, RequestError> {
        let properties = serde_json::to_value(NightLightProperties { night_light })
            .expect("NightLightProperties always serializes");
        let payload = self.notify_payload(
            "set",
            format!("cameras/{}", self.device_id()),
            true,
            properties,
        );
        self.request(payload).await
    }
}
