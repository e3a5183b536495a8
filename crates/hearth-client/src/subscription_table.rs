//! Pending-reply correlation table (spec.md §3/§4.3).
//!
//! Two independent maps behind reader/writer locks: the primary axis keyed
//! by transaction id, and the secondary `(from, resource)` axis supplemented
//! for the snapshot/full-frame-snapshot events that the source never
//! correlates by `transId` (spec.md §9).

use std::collections::HashMap;

use tokio::sync::RwLock;
use tokio::sync::oneshot;

use hearth_protocol::EventEnvelope;

/// Maps a pending transaction id (or `(from, resource)` pair) to the
/// single-shot channel its caller is waiting on.
#[derive(Default)]
pub struct SubscriptionTable {
    by_trans_id: RwLock<HashMap<String, oneshot::Sender<EventEnvelope>>>,
    by_resource: RwLock<HashMap<(String, String), oneshot::Sender<EventEnvelope>>>,
}

impl SubscriptionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending transaction. Overwrites (and silently drops) any
    /// previous registration under the same id — callers are expected to
    /// generate fresh ids per call, so collisions should never occur.
    pub async fn subscribe(&self, trans_id: &str, channel: oneshot::Sender<EventEnvelope>) {
        self.by_trans_id
            .write()
            .await
            .insert(trans_id.to_owned(), channel);
    }

    /// Closes and forgets the delivery channel for `trans_id`. Idempotent.
    pub async fn unsubscribe(&self, trans_id: &str) {
        self.by_trans_id.write().await.remove(trans_id);
    }

    /// Register a pending `(from, resource)`-keyed transaction (snapshot /
    /// full-frame-snapshot extension; spec.md §9).
    pub async fn subscribe_by_resource(
        &self,
        from: &str,
        resource: &str,
        channel: oneshot::Sender<EventEnvelope>,
    ) {
        self.by_resource
            .write()
            .await
            .insert((from.to_owned(), resource.to_owned()), channel);
    }

    pub async fn unsubscribe_by_resource(&self, from: &str, resource: &str) {
        self.by_resource
            .write()
            .await
            .remove(&(from.to_owned(), resource.to_owned()));
    }

    /// Dispatch rule 3 (spec.md §4.3): try `transId` first, then
    /// `(from, resource)`. Envelopes matching neither are discarded.
    pub async fn dispatch(&self, envelope: EventEnvelope) {
        let by_trans_id = self.by_trans_id.write().await.remove(&envelope.trans_id);
        if let Some(channel) = by_trans_id {
            let _ = channel.send(envelope);
            return;
        }

        let key = (envelope.from.clone(), envelope.resource.clone());
        let by_resource = self.by_resource.write().await.remove(&key);
        if let Some(channel) = by_resource {
            let _ = channel.send(envelope);
        }
    }

    /// Number of pending transaction-id registrations (test/debug use).
    #[must_use]
    pub async fn pending_count(&self) -> usize {
        self.by_trans_id.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(trans_id: &str, from: &str, resource: &str) -> EventEnvelope {
        EventEnvelope {
            action: "is".to_owned(),
            resource: resource.to_owned(),
            properties: serde_json::Value::Null,
            trans_id: trans_id.to_owned(),
            from: from.to_owned(),
            to: "user1_web".to_owned(),
            status: None,
        }
    }

    #[tokio::test]
    async fn dispatch_delivers_to_the_matching_trans_id() {
        let table = SubscriptionTable::new();
        let (tx, rx) = oneshot::channel();
        table.subscribe("t1", tx).await;
        table.dispatch(envelope("t1", "bs1", "cameras/c1")).await;
        let received = rx.await.unwrap();
        assert_eq!(received.trans_id, "t1");
    }

    #[tokio::test]
    async fn unmatched_envelope_is_discarded_without_panicking() {
        let table = SubscriptionTable::new();
        table.dispatch(envelope("unknown", "bs1", "cameras/c1")).await;
        assert_eq!(table.pending_count().await, 0);
    }

    #[tokio::test]
    async fn dispatch_removes_the_entry_so_only_one_delivery_ever_happens() {
        let table = SubscriptionTable::new();
        let (tx, rx) = oneshot::channel();
        table.subscribe("t1", tx).await;
        table.dispatch(envelope("t1", "bs1", "cameras/c1")).await;
        drop(rx);
        assert_eq!(table.pending_count().await, 0);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let table = SubscriptionTable::new();
        table.unsubscribe("never-registered").await;
        table.unsubscribe("never-registered").await;
    }

    #[tokio::test]
    async fn resource_axis_delivers_when_trans_id_does_not_match() {
        let table = SubscriptionTable::new();
        let (tx, rx) = oneshot::channel();
        table
            .subscribe_by_resource("bs1", "cameras/c1/fullFrameSnapshot", tx)
            .await;
        table
            .dispatch(envelope("", "bs1", "cameras/c1/fullFrameSnapshot"))
            .await;
        let received = rx.await.unwrap();
        assert_eq!(received.resource, "cameras/c1/fullFrameSnapshot");
    }
}
