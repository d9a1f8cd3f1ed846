//! Session middleware

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use session_security::RequestContext;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Loads the session before the handler runs and attaches the cookie the
/// session emitted, if any, to the response.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let cookie_header = joined_cookie_header(request.headers());
    let context = RequestContext {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        remote_addr: request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr),
        user_agent: request
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    };

    let session = state.manager.load(cookie_header.as_deref(), context).await?;
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    state.manager.finish(&session).await?;
    if let Some(cookie) = session.outgoing_cookie().await {
        let value = HeaderValue::from_str(&cookie.to_header_value())
            .map_err(|e| ApiError::InternalError(format!("invalid Set-Cookie value: {}", e)))?;
        let writes = session.write_count().await;
        debug!(writes = writes, "attaching session cookie");
        response.headers_mut().append(header::SET_COOKIE, value);
    }

    Ok(response)
}

/// HTTP/2 clients may split cookies over several headers.
fn joined_cookie_header(headers: &HeaderMap) -> Option<String> {
    let parts: Vec<&str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}
