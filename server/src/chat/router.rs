//! Message router: push a persisted message to its recipient, if online.
//!
//! The router runs strictly after durable persistence and never reports
//! failure upward — an offline recipient or a dead connection both leave the
//! message waiting in history for the next pull.

use crate::chat::messages::MessageResponse;
use crate::ws::{broadcast, protocol::ServerEvent, ConnectionRegistry};

/// Deliver `message` to the recipient's live connection, exactly once,
/// best-effort. No-op when the recipient is offline.
pub fn route_message(registry: &ConnectionRegistry, recipient_id: &str, message: &MessageResponse) {
    let Some(connection) = registry.lookup(recipient_id) else {
        tracing::debug!(
            recipient_id = %recipient_id,
            message_id = %message.id,
            "Recipient offline, delivery deferred to history"
        );
        return;
    };

    let event = ServerEvent::MessageDelivered {
        message: message.clone(),
    };
    if !broadcast::send_to_connection(&connection.sender, &event) {
        // The socket died but its disconnect has not been processed yet; the
        // next deregister corrects the registry.
        tracing::debug!(
            recipient_id = %recipient_id,
            connection_id = %connection.connection_id,
            "Delivery push failed, connection already closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::ConnectionId;
    use axum::extract::ws::Message;
    use tokio::sync::mpsc::{self, error::TryRecvError};

    fn message(body: &str, sender: &str) -> MessageResponse {
        MessageResponse {
            id: "m1".to_string(),
            conversation_id: "c1".to_string(),
            sender_id: sender.to_string(),
            body: body.to_string(),
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn routes_exactly_once_to_recipient_only() {
        let registry = ConnectionRegistry::new();
        let (alice_tx, mut alice_rx) = mpsc::unbounded_channel();
        let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
        registry.register("alice", ConnectionId::new(), alice_tx);
        registry.register("bob", ConnectionId::new(), bob_tx);

        route_message(&registry, "bob", &message("hi", "alice"));

        let Message::Text(json) = bob_rx.try_recv().expect("bob gets one delivery") else {
            panic!("expected text frame");
        };
        let event: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(event["type"], "message.delivered");
        assert_eq!(event["message"]["body"], "hi");
        assert_eq!(event["message"]["sender_id"], "alice");

        assert!(matches!(bob_rx.try_recv(), Err(TryRecvError::Empty)));
        assert!(matches!(alice_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn offline_recipient_is_a_noop() {
        let registry = ConnectionRegistry::new();
        let (alice_tx, mut alice_rx) = mpsc::unbounded_channel();
        registry.register("alice", ConnectionId::new(), alice_tx);

        route_message(&registry, "bob", &message("bye", "alice"));

        assert!(matches!(alice_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn dead_recipient_connection_does_not_panic() {
        let registry = ConnectionRegistry::new();
        let (bob_tx, bob_rx) = mpsc::unbounded_channel();
        registry.register("bob", ConnectionId::new(), bob_tx);
        drop(bob_rx);

        route_message(&registry, "bob", &message("hi", "alice"));
    }
}
