//! Login → device enumeration → subscribe every base station (spec.md §4.5).

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use reqwest::Url;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{info, warn};

use hearth_protocol::{Device, DevicesResponse, LoginResponse};

use crate::base_station_controller::{BaseStationController, BaseStationIdentity};
use crate::device_handle::{AudioCamera, BaseStation, Camera};
use crate::error::SessionError;
use crate::http_session::HttpSession;

/// Owns the HTTP session, the cached device list, and one
/// [`BaseStationController`] per base station device id.
///
/// Device handles hold a [`Weak`] back-reference to their owning `Session`
/// (never an `Arc`) — the session's own device list must not be kept alive
/// by the handles it hands out (spec.md §9).
pub struct Session {
    http: Arc<HttpSession>,
    token: RwLock<Option<String>>,
    user_id: RwLock<Option<String>>,
    devices: RwLock<Vec<Device>>,
    base_stations: RwLock<HashMap<String, Arc<BaseStationController>>>,
}

impl Session {
    /// `Login(email, password)` (spec.md §4.5). Returns only after every base
    /// station has connected and acknowledged its initial ping, or with an
    /// error.
    pub async fn login(
        base_url: Url,
        email: &str,
        password: &str,
    ) -> Result<Arc<Self>, SessionError> {
        let http = Arc::new(HttpSession::new(base_url)?);
        let session = Arc::new(Self {
            http,
            token: RwLock::new(None),
            user_id: RwLock::new(None),
            devices: RwLock::new(Vec::new()),
            base_stations: RwLock::new(HashMap::new()),
        });

        let login_response: LoginResponse = session
            .http
            .post("login/v2", &json!({ "email": email, "password": password }), None)
            .await?;
        if !login_response.success {
            let reason = login_response
                .error_text()
                .unwrap_or("login rejected")
                .to_owned();
            return Err(SessionError::AuthFailed(reason));
        }
        let data = login_response
            .data
            .ok_or_else(|| SessionError::AuthFailed("login succeeded with no data".to_owned()))?;

        session.http.set_header("Authorization", &data.token).await?;
        *session.token.write().await = Some(data.token.clone());
        *session.user_id.write().await = Some(data.user_id.clone());

        let devices = session.fetch_devices().await?;
        if devices.is_empty() {
            return Err(SessionError::NoDevices);
        }

        if let Some(first) = devices.first() {
            session.http.set_header("xCloudId", &first.x_cloud_id).await?;
        }

        session.subscribe_base_stations(&devices, &data.token).await?;
        *session.devices.write().await = devices;

        Ok(session)
    }

    /// `Logout()`: invalidate the session and disconnect every base station.
    /// Idempotent — calling it twice is a no-op at the stream layer the
    /// second time.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let result = self
            .http
            .put::<_, serde_json::Value>("logout", &json!({}), None)
            .await;
        if let Err(e) = result {
            warn!(error = %e, "logout call failed, still tearing down streams");
        }
        for controller in self.base_stations.read().await.values() {
            controller.disconnect();
        }
        Ok(())
    }

    /// `GetDevices()`: enumerate the account's devices.
    pub async fn fetch_devices(&self) -> Result<Vec<Device>, SessionError> {
        let response: DevicesResponse = self.http.get("users/devices", None).await?;
        if !response.success {
            return Err(SessionError::Service(
                response
                    .error_text()
                    .unwrap_or("GetDevices failed")
                    .to_owned(),
            ));
        }
        Ok(response.data.unwrap_or_default())
    }

    /// Re-fetch the device list and apply the **idempotent reconnect**
    /// policy (SPEC_FULL.md §7): base stations that are still present keep
    /// their existing, already-connected event stream; new ones are
    /// subscribed; ones no longer present are disconnected.
    pub async fn refresh_devices(&self) -> Result<(), SessionError> {
        let new_devices = self.fetch_devices().await?;
        let token = self
            .token
            .read()
            .await
            .clone()
            .ok_or_else(|| SessionError::AuthFailed("refresh before login".to_owned()))?;

        let new_base_station_ids: std::collections::HashSet<String> = new_devices
            .iter()
            .filter(|d| d.is_base_station())
            .map(|d| d.device_id.clone())
            .collect();

        {
            let mut base_stations = self.base_stations.write().await;
            let stale: Vec<String> = base_stations
                .keys()
                .filter(|id| !new_base_station_ids.contains(*id))
                .cloned()
                .collect();
            for id in stale {
                if let Some(controller) = base_stations.remove(&id) {
                    controller.disconnect();
                }
            }
        }

        for device in new_devices.iter().filter(|d| d.is_base_station()) {
            let already_connected = self
                .base_stations
                .read()
                .await
                .get(&device.device_id)
                .is_some_and(|c| c.is_connected());
            if already_connected {
                continue;
            }
            self.subscribe_one(device, &token).await?;
        }

        *self.devices.write().await = new_devices;
        Ok(())
    }

    async fn subscribe_base_stations(
        self: &Arc<Self>,
        devices: &[Device],
        token: &str,
    ) -> Result<(), SessionError> {
        for device in devices.iter().filter(|d| d.is_base_station()) {
            if let Some(prior) = self.base_stations.write().await.remove(&device.device_id) {
                prior.disconnect();
            }
            self.subscribe_one(device, token).await?;
        }
        Ok(())
    }

    async fn subscribe_one(&self, device: &Device, token: &str) -> Result<(), SessionError> {
        let user_id = self
            .user_id
            .read()
            .await
            .clone()
            .ok_or_else(|| SessionError::AuthFailed("no active session".to_owned()))?;

        let identity = BaseStationIdentity {
            device_id: device.device_id.clone(),
            x_cloud_id: device.x_cloud_id.clone(),
            user_id,
        };
        let controller = BaseStationController::subscribe(
            self.http.clone(),
            self.http.raw_client(),
            token,
            identity,
        )
        .await
        .map_err(|source| SessionError::SubscribeFailed {
            device_id: device.device_id.clone(),
            source,
        })?;

        info!(device_id = %device.device_id, "base station connected and pinged");
        self.base_stations
            .write()
            .await
            .insert(device.device_id.clone(), Arc::new(controller));
        Ok(())
    }

    /// All devices classified as base stations.
    pub async fn base_stations(self: &Arc<Self>) -> Vec<BaseStation> {
        let devices = self.devices.read().await;
        let controllers = self.base_stations.read().await;
        devices
            .iter()
            .filter(|d| d.is_base_station())
            .filter_map(|d| {
                controllers
                    .get(&d.device_id)
                    .map(|c| BaseStation::new(d.clone(), c.clone(), Arc::downgrade(self)))
            })
            .collect()
    }

    /// All devices classified as cameras.
    pub async fn cameras(self: &Arc<Self>) -> Vec<Camera> {
        self.devices
            .read()
            .await
            .iter()
            .filter(|d| d.is_camera())
            .map(|d| Camera::new(d.clone(), Arc::downgrade(self)))
            .collect()
    }

    /// All cameras, wrapped with the audio-capable-camera command set.
    /// Whether a given camera actually supports these operations is a
    /// device-capability question the catalog doesn't answer (spec.md §1 —
    /// out of scope); callers decide which of their cameras to wrap.
    pub async fn audio_cameras(self: &Arc<Self>) -> Vec<AudioCamera> {
        self.cameras().await.into_iter().map(AudioCamera::from).collect()
    }

    /// Look up the controller owning `base_station_device_id`, used by
    /// camera handles to route a command through their parent.
    pub(crate) async fn controller_for(
        &self,
        base_station_device_id: &str,
    ) -> Option<Arc<BaseStationController>> {
        self.base_stations
            .read()
            .await
            .get(base_station_device_id)
            .cloned()
    }

    #[must_use]
    pub fn as_weak(self: &Arc<Self>) -> Weak<Self> {
        Arc::downgrade(self)
    }

    /// The shared HTTP session, for catalog entries that bypass the event
    /// stream (`StartStream`/`TakeSnapshot`/`StartRecording`/`StopRecording`
    /// — spec.md §4.6: these POST to plain REST endpoints).
    pub(crate) fn http(&self) -> Arc<HttpSession> {
        self.http.clone()
    }
}
