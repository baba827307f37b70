//! REST endpoints for sending and retrieving messages.
//!
//! Sending persists first and routes second: the handler awaits the durable
//! insert, answers the sender from the committed row, and only then hands the
//! message to the router. A routing failure is invisible to the sender.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::Claims;
use crate::chat::router;
use crate::db::store;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

/// Persisted message as seen by clients, both over REST and in the
/// `message.delivered` WebSocket event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub body: String,
    pub created_at: String,
}

impl From<crate::db::models::Message> for MessageResponse {
    fn from(message: crate::db::models::Message) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            body: message.body,
            created_at: message.created_at,
        }
    }
}

/// POST /api/messages/{peer_id} — Send a message to another user.
/// Finds or creates the conversation, durably appends the message, then
/// pushes it to the recipient's connection if one is registered.
pub async fn send_message(
    State(state): State<AppState>,
    claims: Claims,
    Path(peer_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), StatusCode> {
    if body.message.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if peer_id == claims.sub {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();
    let sender_id = claims.sub.clone();
    let recipient_id = peer_id.clone();

    let message: MessageResponse = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        store::find_user_by_id(&conn, &recipient_id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::NOT_FOUND)?;

        let conversation = store::create_or_find_conversation(&conn, &sender_id, &recipient_id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        store::append_message(&conn, &conversation.id, &sender_id, &body.message)
            .map(MessageResponse::from)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    // The message is durably committed; delivery is best-effort from here.
    router::route_message(&state.connections, &peer_id, &message);

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/messages/{peer_id} — Message history with another user, oldest
/// first. An empty list if the two have never talked.
pub async fn get_messages(
    State(state): State<AppState>,
    claims: Claims,
    Path(peer_id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, StatusCode> {
    let db = state.db.clone();
    let user_id = claims.sub.clone();

    let messages = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        store::find_user_by_id(&conn, &peer_id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::NOT_FOUND)?;

        let conversation = store::find_conversation(&conn, &user_id, &peer_id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        match conversation {
            Some(conversation) => store::list_messages(&conn, &conversation.id)
                .map(|messages| messages.into_iter().map(MessageResponse::from).collect())
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR),
            None => Ok(Vec::new()),
        }
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(messages))
}
