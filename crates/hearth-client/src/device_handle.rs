//! `BaseStation`/`Camera`/`AudioCamera` handles (spec.md §3).
//!
//! Each handle pairs an immutable [`Device`] record with just enough
//! routing context to build and submit a [`NotifyPayload`]. Handles never
//! own the [`Session`] that created them — only a [`Weak`] reference — so
//! the session's device list and the handles it hands out can't form an
//! ownership cycle (spec.md §9).

use std::ops::Deref;
use std::sync::{Arc, Weak};

use hearth_protocol::{Device, EventEnvelope, NotifyPayload};

use crate::base_station_controller::BaseStationController;
use crate::error::RequestError;
use crate::session::Session;

/// A base station: a device plus the live controller driving its event stream.
#[derive(Clone)]
pub struct BaseStation {
    device: Device,
    controller: Arc<BaseStationController>,
    session: Weak<Session>,
}

impl BaseStation {
    pub(crate) fn new(device: Device, controller: Arc<BaseStationController>, session: Weak<Session>) -> Self {
        Self {
            device,
            controller,
            session,
        }
    }

    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device.device_id
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.controller.is_connected()
    }

    #[must_use]
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.upgrade()
    }

    /// Build `from = "<userId>_web"`, addressed to this base station.
    pub(crate) fn notify_payload(
        &self,
        action: &str,
        resource: impl Into<String>,
        publish_response: bool,
        properties: serde_json::Value,
    ) -> NotifyPayload {
        NotifyPayload {
            action: action.to_owned(),
            resource: resource.into(),
            publish_response,
            properties,
            trans_id: String::new(),
            from: format!("{}_web", self.device.user_id),
            to: self.device.device_id.clone(),
        }
    }

    pub(crate) async fn request(&self, payload: NotifyPayload) -> Result<EventEnvelope, RequestError> {
        self.controller.request(payload).await
    }
}

/// A camera: routes commands through its parent base station's controller.
#[derive(Clone)]
pub struct Camera {
    device: Device,
    session: Weak<Session>,
}

impl Camera {
    pub(crate) fn new(device: Device, session: Weak<Session>) -> Self {
        Self { device, session }
    }

    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device.device_id
    }

    #[must_use]
    pub fn parent_id(&self) -> &str {
        &self.device.parent_id
    }

    #[must_use]
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.upgrade()
    }

    /// Build `from = "<userId>_web"`, addressed to this camera's parent
    /// base station (spec.md §4.6 routing rule).
    pub(crate) fn notify_payload(
        &self,
        action: &str,
        resource: impl Into<String>,
        publish_response: bool,
        properties: serde_json::Value,
    ) -> NotifyPayload {
        NotifyPayload {
            action: action.to_owned(),
            resource: resource.into(),
            publish_response,
            properties,
            trans_id: String::new(),
            from: format!("{}_web", self.device.user_id),
            to: self.device.parent_id.clone(),
        }
    }

    pub(crate) async fn request(&self, payload: NotifyPayload) -> Result<EventEnvelope, RequestError> {
        let session = self.session.upgrade().ok_or(RequestError::NotConnected)?;
        let controller = session
            .controller_for(&self.device.parent_id)
            .await
            .ok_or(RequestError::NotConnected)?;
        controller.request(payload).await
    }
}

/// A camera known to support the audio-playback / night-light command set
/// (spec.md §4.6's "audio-capable camera" catalog; grounded on
/// `examples/original_source/arlobaby.go`, whose methods apply "to other
/// camera types that have audio playback or nightlight capabilities" without
/// naming a distinguishing `deviceType` — so upgrading a `Camera` to an
/// `AudioCamera` is the caller's call, not an automatic classification).
#[derive(Clone)]
pub struct AudioCamera(Camera);

impl From<Camera> for AudioCamera {
    fn from(camera: Camera) -> Self {
        Self(camera)
    }
}

impl Deref for AudioCamera {
    type Target = Camera;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AudioCamera {
    #[must_use]
    pub fn into_camera(self) -> Camera {
        self.0
    }
}
