// ============================================================================
// Session API - Auth Handlers
// File: crates/session-api/src/handlers/auth.rs
// ============================================================================
//! Login, current user and logout on top of the session

use axum::Json;
use session_core::UserRef;
use tracing::info;

use crate::dto::{LoginRequest, LogoutResponse, SessionView};
use crate::error::ApiError;
use crate::extract::CurrentSession;
use crate::response::ApiResponse;

/// Login handler - POST /api/v1/auth/login
pub async fn login(
    CurrentSession(session): CurrentSession,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<SessionView>>, ApiError> {
    let user_id = payload.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::BadRequest("user_id is required".into()));
    }

    session.set_user(UserRef::new(user_id)).await?;
    info!(user_id, "user logged in");

    Ok(Json(ApiResponse::success(SessionView::new(
        session.status().await,
        session.snapshot().await,
    ))))
}

/// Current user - GET /api/v1/auth/me
pub async fn me(
    CurrentSession(session): CurrentSession,
) -> Result<Json<ApiResponse<UserRef>>, ApiError> {
    let user = session
        .user()
        .await
        .ok_or_else(|| ApiError::Unauthorized("no user in session".into()))?;
    Ok(Json(ApiResponse::success(user)))
}

/// Logout handler - POST /api/v1/auth/logout
pub async fn logout(
    CurrentSession(session): CurrentSession,
) -> Result<Json<ApiResponse<LogoutResponse>>, ApiError> {
    let had_user = session.user().await.is_some();
    session.destroy().await?;
    if had_user {
        info!("user logged out");
    }
    Ok(Json(ApiResponse::success(LogoutResponse { logged_out: true })))
}
