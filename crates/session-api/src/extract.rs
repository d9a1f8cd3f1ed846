//! Handler access to the request's session

use axum::{extract::FromRequestParts, http::request::Parts};
use session_core::Session;

use crate::error::ApiError;

/// The session the middleware attached to this request.
pub struct CurrentSession(pub Session);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(CurrentSession)
            .ok_or_else(|| ApiError::InternalError("session middleware not installed".into()))
    }
}
