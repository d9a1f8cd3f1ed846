//! Session inspection and cookie attribute updates

use axum::Json;
use session_core::CookieUpdate;

use crate::dto::SessionView;
use crate::error::ApiError;
use crate::extract::CurrentSession;
use crate::response::ApiResponse;

/// GET /api/v1/session
pub async fn show(CurrentSession(session): CurrentSession) -> Json<ApiResponse<SessionView>> {
    Json(ApiResponse::success(SessionView::new(
        session.status().await,
        session.snapshot().await,
    )))
}

/// PUT /api/v1/session/cookie
///
/// Keys are applied in body order, so a body carrying both `maxAge` and
/// `expires` keeps whichever comes last.
pub async fn update_cookie(
    CurrentSession(session): CurrentSession,
    Json(update): Json<CookieUpdate>,
) -> Result<Json<ApiResponse<SessionView>>, ApiError> {
    if update.is_empty() {
        return Err(ApiError::BadRequest("no cookie attributes given".into()));
    }
    session.update_cookie(update).await?;

    Ok(Json(ApiResponse::success(SessionView::new(
        session.status().await,
        session.snapshot().await,
    ))))
}
