//! Real-time connection tracking.
//!
//! The registry is the single source of truth for "who is online": it maps
//! each user to at most one live WebSocket connection. It is constructed once
//! at server start, carried in `AppState`, and every mutation or read goes
//! through its methods under one lock.

pub mod actor;
pub mod broadcast;
pub mod handler;
pub mod protocol;

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use tokio::sync::mpsc;
use uuid::Uuid;

/// Sender half of a WebSocket connection's channel.
/// Other parts of the system clone this to push events to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

/// Opaque identifier for one live WebSocket connection.
/// Issued at connect time, invalid after disconnect, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The connection currently bound to a user.
#[derive(Debug, Clone)]
pub struct RegisteredConnection {
    pub connection_id: ConnectionId,
    pub sender: ConnectionSender,
}

/// Map of user id -> live connection, guarded by a single lock.
///
/// Invariant: at most one connection per user. A reconnect overwrites the old
/// entry (last connect wins); the superseded connection is not force-closed,
/// its eventual disconnect is ignored because the connection id no longer
/// matches.
pub struct ConnectionRegistry {
    inner: Mutex<HashMap<String, RegisteredConnection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Recover the map even if a lock holder panicked; every critical section
    /// is a plain map op, so the map itself is never left half-updated.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, RegisteredConnection>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Bind `user_id` to `connection_id`, replacing any previous binding.
    pub fn register(&self, user_id: &str, connection_id: ConnectionId, sender: ConnectionSender) {
        let replaced = self.lock().insert(
            user_id.to_string(),
            RegisteredConnection {
                connection_id,
                sender,
            },
        );

        if let Some(old) = replaced {
            tracing::debug!(
                user_id = %user_id,
                old_connection_id = %old.connection_id,
                new_connection_id = %connection_id,
                "Connection superseded by reconnect"
            );
        } else {
            tracing::debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Connection registered"
            );
        }
    }

    /// Remove the binding whose current connection id equals `connection_id`.
    ///
    /// Matching by connection identity (not user identity) means a stale
    /// disconnect event from a superseded connection cannot evict the newer
    /// connection of the same user. Unknown ids are a silent no-op, so the
    /// call is idempotent.
    pub fn deregister(&self, connection_id: ConnectionId) {
        let mut map = self.lock();
        let user_id = map
            .iter()
            .find(|(_, conn)| conn.connection_id == connection_id)
            .map(|(user_id, _)| user_id.clone());

        match user_id {
            Some(user_id) => {
                map.remove(&user_id);
                tracing::debug!(
                    user_id = %user_id,
                    connection_id = %connection_id,
                    "Connection deregistered"
                );
            }
            None => {
                tracing::debug!(
                    connection_id = %connection_id,
                    "Deregister for unknown connection ignored"
                );
            }
        }
    }

    /// Current connection for `user_id`, or `None` if offline.
    pub fn lookup(&self, user_id: &str) -> Option<RegisteredConnection> {
        self.lock().get(user_id).cloned()
    }

    /// Immutable copy of the online-user set, sorted for stable output.
    /// Safe to broadcast without holding the registry lock.
    pub fn snapshot(&self) -> Vec<String> {
        let mut users: Vec<String> = self.lock().keys().cloned().collect();
        users.sort();
        users
    }

    /// Senders for every live connection, for fire-and-forget broadcasts.
    pub fn all_senders(&self) -> Vec<ConnectionSender> {
        self.lock().values().map(|conn| conn.sender.clone()).collect()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
