//! WebSocket upgrade endpoint.
//!
//! The handshake re-validates the same signed JWT used for HTTP auth, carried
//! as a query parameter (browsers cannot set headers on WebSocket upgrades).
//! A connection that fails auth is upgraded and immediately closed with a
//! descriptive close code; it never touches the registry.

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;

use crate::auth::jwt;
use crate::state::AppState;
use crate::ws::actor;

/// Query parameters for the WebSocket handshake.
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: String,
}

/// WebSocket close codes:
/// 4001 = token expired
/// 4002 = token invalid
const CLOSE_TOKEN_EXPIRED: u16 = 4001;
const CLOSE_TOKEN_INVALID: u16 = 4002;

/// GET /ws?token=JWT
/// On auth success, spawns the per-connection actor. On failure, upgrades
/// then immediately closes with the appropriate close code.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsAuthQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    match jwt::validate_session_token(&state.jwt_secret, &params.token) {
        Ok(claims) => {
            tracing::info!(user_id = %claims.sub, "WebSocket connection authenticated");
            ws.on_upgrade(move |socket| actor::run_connection(socket, state, claims.sub))
        }
        Err(err) => {
            let (close_code, reason) = match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    (CLOSE_TOKEN_EXPIRED, "Token expired")
                }
                _ => (CLOSE_TOKEN_INVALID, "Token invalid"),
            };

            tracing::warn!(close_code, reason, "WebSocket auth failed");

            ws.on_upgrade(move |socket| close_unauthenticated(socket, close_code, reason))
        }
    }
}

async fn close_unauthenticated(mut socket: WebSocket, close_code: u16, reason: &'static str) {
    let close_frame = CloseFrame {
        code: close_code,
        reason: reason.into(),
    };
    let _ = socket.send(Message::Close(Some(close_frame))).await;
}
