//! Connect, keepalive, request/reply (spec.md §4.4).

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use hearth_protocol::{EventEnvelope, NotifyPayload};

use crate::error::{HttpError, RequestError};
use crate::event_stream::EventStream;
use crate::http_session::HttpSession;
use crate::trans_id::gen_trans_id;

const REQUEST_DEADLINE: Duration = Duration::from_secs(10);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Identity of the base station this controller drives requests for.
#[derive(Debug, Clone)]
pub struct BaseStationIdentity {
    pub device_id: String,
    pub x_cloud_id: String,
    pub user_id: String,
}

/// Owns one base station's `EventStream`, its keepalive task, and the
/// `Request` primitive callers in the command catalog build on.
pub struct BaseStationController {
    identity: BaseStationIdentity,
    http: Arc<HttpSession>,
    stream: Arc<EventStream>,
    keepalive_handle: Option<JoinHandle<()>>,
}

impl BaseStationController {
    /// Subscribe: open the event stream, wait for the initial connect, send
    /// the establishing ping, then spawn the keepalive loop.
    pub async fn subscribe(
        http: Arc<HttpSession>,
        raw_client: reqwest::Client,
        token: &str,
        identity: BaseStationIdentity,
    ) -> Result<Self, RequestError> {
        let subscribe_url = http
            .base_url()
            .join(&format!("client/subscribe?token={token}"))
            .map_err(|e| RequestError::Http(HttpError::Decode(e.to_string())))?;

        let stream = EventStream::connect(raw_client, subscribe_url)
            .await
            .map_err(RequestError::Stream)?;
        stream
            .wait_connected()
            .await
            .map_err(RequestError::Stream)?;

        let stream = Arc::new(stream);
        send_ping(&http, &stream, &identity).await?;

        let keepalive_handle = spawn_keepalive(http.clone(), stream.clone(), identity.clone());

        info!(device_id = %identity.device_id, "base station subscribed");
        Ok(Self {
            identity,
            http,
            stream,
            keepalive_handle: Some(keepalive_handle),
        })
    }

    /// Publish `payload` and await its reply within the 10-second deadline.
    pub async fn request(&self, payload: NotifyPayload) -> Result<EventEnvelope, RequestError> {
        send_request(&self.http, &self.stream, &self.identity, payload).await
    }

    /// `Ping` — both establishes the server-side subscription and keeps it alive.
    pub async fn ping(&self) -> Result<EventEnvelope, RequestError> {
        send_ping(&self.http, &self.stream, &self.identity).await
    }

    #[must_use]
    pub fn identity(&self) -> &BaseStationIdentity {
        &self.identity
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.stream.is_disconnected()
    }

    /// Tear down the event stream and keepalive task. Idempotent.
    pub fn disconnect(&self) {
        self.stream.disconnect();
        if let Some(handle) = &self.keepalive_handle {
            handle.abort();
        }
    }
}

impl Drop for BaseStationController {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn ping_payload(identity: &BaseStationIdentity) -> NotifyPayload {
    NotifyPayload {
        action: "set".to_owned(),
        resource: format!("subscriptions/{}_web", identity.user_id),
        publish_response: false,
        properties: serde_json::json!({ "devices": [identity.device_id] }),
        trans_id: String::new(),
        from: format!("{}_web", identity.user_id),
        to: identity.device_id.clone(),
    }
}

async fn send_ping(
    http: &HttpSession,
    stream: &EventStream,
    identity: &BaseStationIdentity,
) -> Result<EventEnvelope, RequestError> {
    send_request(http, stream, identity, ping_payload(identity)).await
}

/// `Request(payload)` (spec.md §4.4): generate a fresh transaction id,
/// register a single-shot delivery channel, publish, and race the reply
/// against the stream's error/disconnect signals and the request deadline.
/// Unconditionally unregisters the transaction id on every exit path.
async fn send_request(
    http: &HttpSession,
    stream: &EventStream,
    identity: &BaseStationIdentity,
    mut payload: NotifyPayload,
) -> Result<EventEnvelope, RequestError> {
    let trans_id = gen_trans_id();
    payload.trans_id = trans_id.clone();

    if stream.is_disconnected() {
        return Err(RequestError::NotConnected);
    }

    let (tx, rx) = oneshot::channel();
    stream.subscribe(&trans_id, tx).await;

    let result = publish_and_await(http, stream, identity, &trans_id, &payload, rx).await;
    stream.unsubscribe(&trans_id).await;
    result
}

async fn publish_and_await(
    http: &HttpSession,
    stream: &EventStream,
    identity: &BaseStationIdentity,
    trans_id: &str,
    payload: &NotifyPayload,
    rx: oneshot::Receiver<EventEnvelope>,
) -> Result<EventEnvelope, RequestError> {
    let path = format!("users/devices/notify/{}", identity.device_id);
    let mut extra = HeaderMap::new();
    extra.insert(
        HeaderName::from_static("xcloudid"),
        HeaderValue::from_str(&identity.x_cloud_id)
            .map_err(|e| RequestError::Http(HttpError::Decode(e.to_string())))?,
    );

    http.post::<_, Value>(&path, payload, Some(extra))
        .await
        .map_err(RequestError::Http)?;

    tokio::select! {
        biased;
        reply = rx => {
            reply.map_err(|_| RequestError::StreamClosed)
        }
        () = stream.disconnected_signal() => {
            match stream.last_error() {
                Some(e) => Err(RequestError::Stream(e)),
                None => Err(RequestError::StreamClosed),
            }
        }
        () = tokio::time::sleep(REQUEST_DEADLINE) => {
            Err(RequestError::Timeout)
        }
    }
    .inspect_err(|_| {
        warn!(trans_id, device_id = %identity.device_id, "request did not complete");
    })
}

fn spawn_keepalive(
    http: Arc<HttpSession>,
    stream: Arc<EventStream>,
    identity: BaseStationIdentity,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(KEEPALIVE_INTERVAL);
        interval.tick().await; // first tick fires immediately; skip it, ping already sent by subscribe()
        loop {
            interval.tick().await;
            if stream.is_disconnected() {
                return;
            }
            if let Err(e) = send_ping(&http, &stream, &identity).await {
                warn!(device_id = %identity.device_id, error = %e, "keepalive ping failed, disconnecting");
                stream.disconnect();
                return;
            }
        }
    })
}

// End-to-end scenarios against a fake base station (spec.md §8 S1/S3-S7)
// live in `tests/base_station_scenarios.rs`, in the integration-test style
// the teacher workspace uses for its own request/reply protocol clients
// (`services/forwarder/tests/`).
