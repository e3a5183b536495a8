//! Error taxonomy for the client. One enum per layer, matching the
//! granularity `SessionError`/`UplinkError` use in the reference workspace.

use thiserror::Error;

/// Errors from the HTTP session layer (§4.1).
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode: {0}")]
    Decode(String),
}

/// Errors from the event stream layer (§4.3).
///
/// Stored as strings (not `#[from] reqwest::Error`) rather than the
/// underlying transport error, so a single instance can be cloned onto the
/// stream's shared error slot and handed to every in-flight `Request` that
/// was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("subscribe failed: {0}")]
    SubscribeFailed(String),
}

/// Errors from `BaseStationController::request` / the command catalog (§4.4, §4.6).
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("not connected")]
    NotConnected,
    #[error("stream closed while request was in flight")]
    StreamClosed,
    #[error("request timed out")]
    Timeout,
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error("service error: {0}")]
    Service(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Errors from the session orchestrator (§4.5).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    #[error("no devices returned for this account")]
    NoDevices,
    #[error("service error: {0}")]
    Service(String),
    #[error("subscribe failed for base station {device_id}: {source}")]
    SubscribeFailed {
        device_id: String,
        source: RequestError,
    },
    #[error(transparent)]
    Request(#[from] RequestError),
}
