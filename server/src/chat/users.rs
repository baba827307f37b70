//! Sidebar user listing.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::auth::middleware::Claims;
use crate::db::store;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UserSummaryResponse {
    pub id: String,
    pub fullname: String,
    pub avatar_url: String,
}

/// GET /api/messages/users — Every registered user except the caller.
/// The client pairs this with `presence.update` events to mark who is online.
pub async fn list_users(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<UserSummaryResponse>>, StatusCode> {
    let db = state.db.clone();

    let users = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        store::list_users_except(&conn, &claims.sub).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(
        users
            .into_iter()
            .map(|user| UserSummaryResponse {
                id: user.id,
                fullname: user.fullname,
                avatar_url: user.avatar_url,
            })
            .collect(),
    ))
}
