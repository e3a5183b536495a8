use serde::{Deserialize, Serialize};

/// An immutable device record as returned by `GET /users/devices`.
///
/// Fetched once after login and owned by the session orchestrator; device
/// handles hold a copy plus a weak back-reference to the owning session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    #[serde(rename = "parentId")]
    pub parent_id: String,
    #[serde(rename = "deviceType")]
    pub device_type: String,
    #[serde(rename = "xCloudId")]
    pub x_cloud_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "uniqueId", default)]
    pub unique_id: String,
    #[serde(rename = "modelId", default)]
    pub model_id: String,
    #[serde(rename = "deviceName", default)]
    pub device_name: String,
    #[serde(rename = "state", default)]
    pub state: String,
    #[serde(default)]
    pub properties: serde_json::Value,
}

impl Device {
    /// A device is a base station iff `deviceType=="basestation"`, or it is
    /// its own parent, or it does not belong to the camera-class device
    /// types. Standalone cameras act as their own base station and satisfy
    /// both `is_base_station` and `is_camera`.
    #[must_use]
    pub fn is_base_station(&self) -> bool {
        self.device_type == DeviceType::BASESTATION
            || self.device_id == self.parent_id
            || !Self::is_camera_class(&self.device_type)
    }

    #[must_use]
    pub fn is_camera(&self) -> bool {
        Self::is_camera_class(&self.device_type)
    }

    fn is_camera_class(device_type: &str) -> bool {
        matches!(device_type, DeviceType::CAMERA | DeviceType::ARLOQ)
    }
}

/// Known `deviceType` values. Kept as string constants (rather than a closed
/// enum) because the service has historically added device types this
/// client doesn't need to special-case — only base-station-vs-camera
/// classification matters here.
pub struct DeviceType;

impl DeviceType {
    pub const BASESTATION: &'static str = "basestation";
    pub const CAMERA: &'static str = "camera";
    pub const ARLOQ: &'static str = "arloq";
}
