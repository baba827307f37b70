use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

/// Name of the HttpOnly session cookie set at login/register.
pub const SESSION_COOKIE: &str = "token";

/// JWT session claims. Implements axum's FromRequestParts for use as an
/// extractor: accepts either `Authorization: Bearer` or the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID (UUIDv7)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);

        let token = match bearer {
            Some(token) => token,
            None => {
                // Browser clients carry the session cookie instead
                let jar = CookieJar::from_request_parts(parts, state)
                    .await
                    .map_err(|_| StatusCode::UNAUTHORIZED)?;
                jar.get(SESSION_COOKIE)
                    .map(|cookie| cookie.value().to_string())
                    .ok_or(StatusCode::UNAUTHORIZED)?
            }
        };

        // Get JWT secret from request extensions (set by middleware layer)
        let jwt_secret = parts
            .extensions
            .get::<JwtSecret>()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

        crate::auth::jwt::validate_session_token(&jwt_secret.0, &token)
            .map_err(|_| StatusCode::UNAUTHORIZED)
    }
}

/// JWT secret stored in request extensions for the Claims extractor
#[derive(Clone)]
pub struct JwtSecret(pub Vec<u8>);
