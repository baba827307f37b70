//! Server-to-client WebSocket events.
//!
//! Events are JSON text frames tagged by `type`. Clients never speak this
//! protocol back to the server: messages are sent over REST, and the socket
//! only carries pushes.

use axum::extract::ws::Message;
use serde::Serialize;

use crate::chat::messages::MessageResponse;

/// Events pushed from the server to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Current online-user set, broadcast to every connection on each
    /// registry change.
    #[serde(rename = "presence.update")]
    PresenceUpdate { online_user_ids: Vec<String> },

    /// A freshly persisted message, pushed only to the addressed recipient.
    #[serde(rename = "message.delivered")]
    MessageDelivered { message: MessageResponse },
}

impl ServerEvent {
    /// Encode as a WebSocket text frame. Returns `None` only if JSON
    /// serialization fails, which is logged and treated as a dropped push.
    pub fn to_ws_message(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(json) => Some(Message::Text(json.into())),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode server event");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_update_wire_shape() {
        let event = ServerEvent::PresenceUpdate {
            online_user_ids: vec!["u1".to_string(), "u2".to_string()],
        };

        let Some(Message::Text(json)) = event.to_ws_message() else {
            panic!("expected a text frame");
        };
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "presence.update");
        assert_eq!(value["online_user_ids"][0], "u1");
        assert_eq!(value["online_user_ids"][1], "u2");
    }

    #[test]
    fn message_delivered_wire_shape() {
        let event = ServerEvent::MessageDelivered {
            message: MessageResponse {
                id: "m1".to_string(),
                conversation_id: "c1".to_string(),
                sender_id: "u1".to_string(),
                body: "hi".to_string(),
                created_at: "2026-01-01T00:00:00+00:00".to_string(),
            },
        };

        let Some(Message::Text(json)) = event.to_ws_message() else {
            panic!("expected a text frame");
        };
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "message.delivered");
        assert_eq!(value["message"]["body"], "hi");
        assert_eq!(value["message"]["sender_id"], "u1");
    }
}
