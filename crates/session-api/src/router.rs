use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::handlers;
use crate::middleware::session_middleware;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(handlers::health::health_check));

    let session_routes = Router::new()
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/auth/me", get(handlers::auth::me))
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        .route("/api/v1/session", get(handlers::session::show))
        .route("/api/v1/session/cookie", put(handlers::session::update_cookie))
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(state)
}
