//! Session handlers.

use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use esim_shop_core::UserId;

use crate::auth::session_cookie;

/// New session response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// The session id to send as `x-session-id` (also set as a cookie).
    pub session_id: String,
}

/// Start an anonymous shopping session.
pub async fn create_session() -> impl IntoResponse {
    let user_id = UserId::generate();
    tracing::debug!(user_id = %user_id, "Session created");

    (
        StatusCode::CREATED,
        [(SET_COOKIE, session_cookie(&user_id))],
        Json(SessionResponse {
            session_id: user_id.to_string(),
        }),
    )
}
