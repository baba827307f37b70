//! Fire-and-forget event delivery helpers.
//!
//! No acknowledgment, no retry: a send to a dead-but-not-yet-deregistered
//! connection fails silently and the next disconnect event corrects the
//! registry.

use super::{ConnectionRegistry, ConnectionSender};
use crate::ws::protocol::ServerEvent;

/// Push an event to a single connection. Returns false if the connection's
/// channel is already closed.
pub fn send_to_connection(sender: &ConnectionSender, event: &ServerEvent) -> bool {
    match event.to_ws_message() {
        Some(msg) => sender.send(msg).is_ok(),
        None => false,
    }
}

/// Push an event to every live connection, encoding it once.
pub fn broadcast_to_all(registry: &ConnectionRegistry, event: &ServerEvent) {
    let Some(msg) = event.to_ws_message() else {
        return;
    };

    for sender in registry.all_senders() {
        let _ = sender.send(msg.clone());
    }
}

/// Presence broadcaster: announce the current online-user set to every
/// connection, including the one whose change triggered the announce.
pub fn announce_presence(registry: &ConnectionRegistry) {
    let online_user_ids = registry.snapshot();
    tracing::debug!(online = online_user_ids.len(), "Broadcasting presence update");

    broadcast_to_all(registry, &ServerEvent::PresenceUpdate { online_user_ids });
}
