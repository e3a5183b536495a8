//! One SSE connection per base station (spec.md §4.3).
//!
//! ```text
//!       NEW ──listen()──▶ OPENING ──status=connected──▶ CONNECTED
//!                            │                               │
//!                 subscribe error / EOF            disconnect() / status=disconnected
//!                 status=disconnected / logout                │ action=logout
//!                            ▼                                 ▼
//!                          DISCONNECTED (terminal, teardown runs exactly once)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Url;
use tokio::sync::{Notify, oneshot, watch};
use tracing::{debug, warn};
use uuid::Uuid;

use hearth_protocol::EventEnvelope;

use crate::error::StreamError;
use crate::subscription_table::SubscriptionTable;

/// Owns one SSE connection, its subscription table, and its lifecycle signals.
pub struct EventStream {
    /// Internal correlation id for log lines, distinct from any wire
    /// `transId` — useful once a session owns more than one base station's
    /// stream and their log output interleaves.
    connection_id: Uuid,
    subscriptions: Arc<SubscriptionTable>,
    connected_tx: watch::Sender<bool>,
    connected_rx: watch::Receiver<bool>,
    disconnect_notify: Arc<Notify>,
    disconnected: Arc<AtomicBool>,
    /// Set once, just before `disconnect_notify` fires, when termination was
    /// caused by a transport or decode failure rather than a normal
    /// `status=disconnected`/`logout`/explicit `disconnect()` (spec.md §4.3:
    /// "Decoding errors ... terminate the listener"; §4.4 step 6(b): "the
    /// stream's error channel — fail with a wrapped error").
    error: Arc<Mutex<Option<StreamError>>>,
}

impl EventStream {
    /// Open the SSE connection at `url` and start the background listener.
    /// Safe to call once per stream (mirrors spec.md's `listen()` contract).
    pub async fn connect(client: reqwest::Client, url: Url) -> Result<Self, StreamError> {
        let connection_id = Uuid::new_v4();
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))?;
        let byte_stream = response.bytes_stream();
        let mut sse = byte_stream.eventsource();

        let subscriptions = Arc::new(SubscriptionTable::new());
        let (connected_tx, connected_rx) = watch::channel(false);
        let disconnect_notify = Arc::new(Notify::new());
        let disconnected = Arc::new(AtomicBool::new(false));
        let error = Arc::new(Mutex::new(None));

        let task_subscriptions = subscriptions.clone();
        let task_connected_tx = connected_tx.clone();
        let task_disconnect_notify = disconnect_notify.clone();
        let task_disconnected = disconnected.clone();
        let task_error = error.clone();

        tokio::spawn(async move {
            while let Some(event) = sse.next().await {
                if task_disconnected.load(Ordering::SeqCst) {
                    break;
                }
                match event {
                    Ok(event) => {
                        let envelope: EventEnvelope = match serde_json::from_str(&event.data) {
                            Ok(envelope) => envelope,
                            Err(e) => {
                                warn!(%connection_id, error = %e, "failed to decode SSE envelope, terminating listener");
                                set_error(&task_error, StreamError::Decode(e.to_string()));
                                break;
                            }
                        };
                        dispatch_envelope(
                            envelope,
                            &task_subscriptions,
                            &task_connected_tx,
                            &task_disconnect_notify,
                            &task_disconnected,
                        )
                        .await;
                    }
                    Err(e) => {
                        debug!(%connection_id, error = %e, "SSE transport error, terminating listener");
                        set_error(&task_error, StreamError::Transport(e.to_string()));
                        break;
                    }
                }
            }
            trigger_disconnect(&task_disconnect_notify, &task_disconnected);
        });

        Ok(Self {
            connection_id,
            subscriptions,
            connected_tx,
            connected_rx,
            disconnect_notify,
            disconnected,
            error,
        })
    }

    /// Internal correlation id for this connection's log lines.
    #[must_use]
    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Block until the stream reports `connected` or terminates.
    pub async fn wait_connected(&self) -> Result<(), StreamError> {
        let mut rx = self.connected_rx.clone();
        loop {
            if *rx.borrow() {
                return Ok(());
            }
            if self.is_disconnected() {
                return Err(StreamError::SubscribeFailed(
                    "stream disconnected before connecting".to_owned(),
                ));
            }
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Err(StreamError::SubscribeFailed("connection signal closed".to_owned()));
                    }
                }
                () = self.disconnect_notify.notified() => {
                    return Err(StreamError::SubscribeFailed(
                        "stream disconnected before connecting".to_owned(),
                    ));
                }
            }
        }
    }

    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    pub async fn subscribe(&self, trans_id: &str, channel: oneshot::Sender<EventEnvelope>) {
        self.subscriptions.subscribe(trans_id, channel).await;
    }

    pub async fn unsubscribe(&self, trans_id: &str) {
        self.subscriptions.unsubscribe(trans_id).await;
    }

    pub async fn subscribe_by_resource(
        &self,
        from: &str,
        resource: &str,
        channel: oneshot::Sender<EventEnvelope>,
    ) {
        self.subscriptions
            .subscribe_by_resource(from, resource, channel)
            .await;
    }

    pub async fn unsubscribe_by_resource(&self, from: &str, resource: &str) {
        self.subscriptions.unsubscribe_by_resource(from, resource).await;
    }

    /// Wait for the disconnected signal to fire (used by `Request`'s select).
    pub async fn disconnected_signal(&self) {
        if self.is_disconnected() {
            return;
        }
        self.disconnect_notify.notified().await;
    }

    /// The transport/decode error that terminated the listener, if
    /// termination was caused by one rather than a normal disconnect
    /// (spec.md §4.4 step 6(b)). Checked by `Request` once
    /// `disconnected_signal` fires, so every in-flight caller sees the same
    /// wrapped error rather than a generic `StreamClosed`.
    #[must_use]
    pub fn last_error(&self) -> Option<StreamError> {
        self.error.lock().expect("error mutex poisoned").clone()
    }

    /// Tear down the stream. Idempotent (spec.md invariant 3).
    pub fn disconnect(&self) {
        trigger_disconnect(&self.disconnect_notify, &self.disconnected);
    }
}

fn set_error(slot: &Mutex<Option<StreamError>>, err: StreamError) {
    *slot.lock().expect("error mutex poisoned") = Some(err);
}

async fn dispatch_envelope(
    envelope: EventEnvelope,
    subscriptions: &SubscriptionTable,
    connected_tx: &watch::Sender<bool>,
    disconnect_notify: &Notify,
    disconnected: &AtomicBool,
) {
    if envelope.is_connected() {
        let _ = connected_tx.send(true);
        return;
    }
    if envelope.is_disconnected() {
        trigger_disconnect(disconnect_notify, disconnected);
        return;
    }
    subscriptions.dispatch(envelope).await;
}

fn trigger_disconnect(disconnect_notify: &Notify, disconnected: &AtomicBool) {
    if disconnected
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
    {
        disconnect_notify.notify_waiters();
    }
}
