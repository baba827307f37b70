//! Account endpoints: register, login, logout, me.
//!
//! Successful register/login set the session JWT as an HttpOnly cookie; the
//! same token is also valid as a Bearer header for non-browser clients.

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::{Claims, SESSION_COOKIE};
use crate::auth::{jwt, password};
use crate::db::store;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub fullname: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub gender: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user account (never includes the password hash).
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub fullname: String,
    pub username: String,
    pub email: String,
    pub avatar_url: String,
}

impl From<crate::db::models::User> for UserResponse {
    fn from(user: crate::db::models::User) -> Self {
        Self {
            id: user.id,
            fullname: user.fullname,
            username: user.username,
            email: user.email,
            avatar_url: user.avatar_url,
        }
    }
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::days(15))
        .build()
}

fn avatar_url_for(gender: &str) -> String {
    let style = if gender == "male" { "boy" } else { "girl" };
    format!("https://avatar.iran.liara.run/public/{style}")
}

/// POST /api/auth/register — Create an account and start a session.
/// All fields required; passwords must match; email and username must be
/// unused (409 otherwise).
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> Result<(CookieJar, (StatusCode, Json<UserResponse>)), StatusCode> {
    let all_present = !body.fullname.is_empty()
        && !body.username.is_empty()
        && !body.email.is_empty()
        && !body.password.is_empty()
        && !body.confirm_password.is_empty();
    if !all_present {
        return Err(StatusCode::BAD_REQUEST);
    }
    if body.password != body.confirm_password {
        return Err(StatusCode::BAD_REQUEST);
    }
    if body.gender != "male" && body.gender != "female" {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();
    let user = tokio::task::spawn_blocking(move || {
        // Argon2 hashing is slow on purpose, keep it off the async runtime
        let password_hash =
            password::hash_password(&body.password).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        if store::identity_taken(&conn, &body.email, &body.username)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        {
            return Err(StatusCode::CONFLICT);
        }

        let new_user = store::NewUser {
            username: body.username.clone(),
            fullname: body.fullname.clone(),
            email: body.email.clone(),
            password_hash,
            gender: body.gender.clone(),
            avatar_url: avatar_url_for(&body.gender),
        };
        store::create_user(&conn, &new_user).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    let token = jwt::issue_session_token(&state.jwt_secret, &user.id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((
        jar.add(session_cookie(token)),
        (StatusCode::CREATED, Json(user.into())),
    ))
}

/// POST /api/auth/login — Verify credentials and start a session.
/// Unknown email and wrong password both answer 401 without distinction.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<UserResponse>), StatusCode> {
    if body.email.is_empty() || body.password.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();
    let user = tokio::task::spawn_blocking(move || {
        let user = {
            let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            store::find_user_by_email(&conn, &body.email)
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
                .ok_or(StatusCode::UNAUTHORIZED)?
            // Lock released before the slow hash verification
        };

        if !password::verify_password(&body.password, &user.password_hash) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        Ok(user)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    let token = jwt::issue_session_token(&state.jwt_secret, &user.id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((jar.add(session_cookie(token)), Json(user.into())))
}

/// POST /api/auth/logout — Clear the session cookie.
pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        StatusCode::OK,
    )
}

/// GET /api/auth/me — Profile of the authenticated user.
pub async fn me(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<UserResponse>, StatusCode> {
    let db = state.db.clone();
    let user = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        store::find_user_by_id(&conn, &claims.sub)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::NOT_FOUND)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(user.into()))
}
