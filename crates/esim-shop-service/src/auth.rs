//! Session extraction.
//!
//! Shoppers are anonymous. Each browser carries a session id, a UUID sent
//! either in the `x-session-id` header or in the `esim_session` cookie, and
//! everything the shopper saves is stored under it.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;

use esim_shop_core::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "esim_session";

/// Session cookie lifetime, matching the payment method expiry default.
pub const SESSION_COOKIE_MAX_AGE_SECONDS: u64 = 60 * 60 * 24 * 30;

/// The shopper behind a request.
#[derive(Debug, Clone, Copy)]
pub struct SessionUser {
    /// The session's user ID.
    pub user_id: UserId,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| session_from_cookies(parts))
            .ok_or(ApiError::Unauthorized)?;

        let user_id = raw.trim().parse::<UserId>().map_err(|_| ApiError::Unauthorized)?;
        Ok(Self { user_id })
    }
}

fn session_from_cookies(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE).then(|| value.to_string())
        })
}

/// `Set-Cookie` value establishing `user_id` as the browser's session.
#[must_use]
pub fn session_cookie(user_id: &UserId) -> String {
    format!(
        "{SESSION_COOKIE}={user_id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_COOKIE_MAX_AGE_SECONDS}"
    )
}
