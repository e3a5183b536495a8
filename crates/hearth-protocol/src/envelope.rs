use serde::{Deserialize, Serialize};

/// A command published to the notify endpoint. Discarded after publish.
///
/// `from` is always `"<userId>_web"`; `to` is the target device id (a
/// base-station device id, or a camera's `parentId` when the command is
/// routed through its base station).
#[derive(Debug, Clone, Serialize)]
pub struct NotifyPayload {
    pub action: String,
    pub resource: String,
    #[serde(rename = "publishResponse")]
    pub publish_response: bool,
    pub properties: serde_json::Value,
    #[serde(rename = "transId")]
    pub trans_id: String,
    pub from: String,
    pub to: String,
}

/// The decoded body of an SSE `data:` frame.
///
/// Recognized lifecycle envelopes carry `status` (`"connected"` /
/// `"disconnected"`) or `action == "logout"`; all others are command replies
/// correlated by `trans_id`, or — for the snapshot/full-frame-snapshot
/// extension — by `(from, resource)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub properties: serde_json::Value,
    #[serde(rename = "transId", default)]
    pub trans_id: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl EventEnvelope {
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status.as_deref() == Some("connected")
    }

    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.status.as_deref() == Some("disconnected") || self.action == "logout"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips_through_json() {
        let original = EventEnvelope {
            action: "is".to_owned(),
            resource: "cameras/c1".to_owned(),
            properties: serde_json::json!({"brightness": 1}),
            trans_id: "web!deadbeef!1234".to_owned(),
            from: "bs1".to_owned(),
            to: "user1_web".to_owned(),
            status: None,
        };
        let json = serde_json::to_string(&original).unwrap();
        let decoded: EventEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.action, original.action);
        assert_eq!(decoded.resource, original.resource);
        assert_eq!(decoded.properties, original.properties);
        assert_eq!(decoded.trans_id, original.trans_id);
        assert_eq!(decoded.from, original.from);
        assert_eq!(decoded.to, original.to);
        assert_eq!(decoded.status, original.status);
    }

    #[test]
    fn status_connected_is_recognized() {
        let e = EventEnvelope {
            status: Some("connected".to_owned()),
            ..blank()
        };
        assert!(e.is_connected());
        assert!(!e.is_disconnected());
    }

    #[test]
    fn status_disconnected_is_recognized() {
        let e = EventEnvelope {
            status: Some("disconnected".to_owned()),
            ..blank()
        };
        assert!(e.is_disconnected());
    }

    #[test]
    fn logout_action_counts_as_disconnected() {
        let e = EventEnvelope {
            action: "logout".to_owned(),
            ..blank()
        };
        assert!(e.is_disconnected());
    }

    fn blank() -> EventEnvelope {
        EventEnvelope {
            action: String::new(),
            resource: String::new(),
            properties: serde_json::Value::Null,
            trans_id: String::new(),
            from: String::new(),
            to: String::new(),
            status: None,
        }
    }
}
