use serde::{Deserialize, Serialize};

/// Generic `{success, data, reason, message}` envelope used by most REST
/// calls. `reason`/`message` are populated by the service on `success:
/// false` and are surfaced as `ServiceError`/`AuthFailed` context.
#[derive(Debug, Clone, Deserialize)]
pub struct GenericResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> GenericResponse<T> {
    /// The reason or message text, whichever is present, for error context.
    #[must_use]
    pub fn error_text(&self) -> Option<&str> {
        self.reason
            .as_deref()
            .or(self.message.as_deref())
    }
}

/// `POST /login/v2` success payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub token: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

pub type LoginResponse = GenericResponse<LoginData>;

/// `POST /users/devices/startStream` success payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamData {
    pub url: String,
}

pub type StreamResponse = GenericResponse<StreamData>;

/// `GET /users/devices` success payload.
pub type DevicesResponse = GenericResponse<Vec<crate::Device>>;
