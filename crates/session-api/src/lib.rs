//! # Session API
//!
//! Session middleware, extractor, demo handlers and the router.

pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use extract::CurrentSession;
pub use router::build_router;
pub use state::AppState;
