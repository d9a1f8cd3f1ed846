//! Session services

pub mod session;
pub mod session_manager;

pub use session::{Session, SessionStatus};
pub use session_manager::{SessionManager, SessionOptions};
