//! Actor-per-connection lifecycle.
//!
//! Each authenticated socket is split into a writer task (owns the sink, fed
//! by an mpsc channel) and a reader loop. Registration happens on entry,
//! deregistration on any exit path, and both trigger a presence announce.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::state::AppState;
use crate::ws::{broadcast, ConnectionId};

/// Server sends a WebSocket ping every 30 seconds to detect dead peers.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// If no pong arrives within 10 seconds after a ping, the connection is
/// treated as gone.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the connection from CONNECTED until disconnect.
///
/// On entry the connection is bound to `user_id` in the registry and presence
/// is announced. On any exit (client close, transport error, pong timeout)
/// the binding is removed by connection id and presence is announced again.
/// Disconnect is terminal: no retry, no in-flight drain.
pub async fn run_connection(socket: WebSocket, state: AppState, user_id: String) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    let connection_id = ConnectionId::new();
    state.connections.register(&user_id, connection_id, tx.clone());
    broadcast::announce_presence(&state.connections);

    tracing::info!(
        user_id = %user_id,
        connection_id = %connection_id,
        "WebSocket actor started"
    );

    // Writer task: forwards mpsc messages to the WebSocket sink.
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Ping task: periodic pings, close on missed pong.
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();
    let ping_tx = tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(PING_INTERVAL);
        // Skip the immediate first tick
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                // Writer task has died, connection is gone
                break;
            }

            match timeout(PONG_TIMEOUT, pong_rx.recv()).await {
                Ok(Some(())) => {}
                _ => {
                    tracing::warn!("Pong timeout, closing connection");
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "Pong timeout".into(),
                    })));
                    break;
                }
            }
        }
    });

    // Reader loop. Clients do not speak a request protocol over the socket
    // (messages are sent via REST), so inbound frames only manage liveness.
    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Pong(_) => {
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(
                        user_id = %user_id,
                        reason = ?frame,
                        "Client initiated close"
                    );
                    break;
                }
                Message::Text(_) | Message::Binary(_) => {
                    tracing::debug!(user_id = %user_id, "Ignoring inbound frame");
                }
            },
            Some(Err(e)) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
            None => {
                tracing::info!(user_id = %user_id, "WebSocket stream ended");
                break;
            }
        }
    }

    writer_handle.abort();
    ping_handle.abort();

    // Deregister by connection id: if this user already reconnected, the
    // registry keeps the newer connection and this is a no-op.
    state.connections.deregister(connection_id);
    broadcast::announce_presence(&state.connections);

    tracing::info!(
        user_id = %user_id,
        connection_id = %connection_id,
        "WebSocket actor stopped"
    );
}

/// Writer task: receives messages from the mpsc channel and forwards them to
/// the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed, connection is broken
            break;
        }
    }
}
