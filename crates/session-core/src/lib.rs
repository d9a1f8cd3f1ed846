//! # Session Core
//! 
//! Session data model, the store port, and the write-through session manager.

pub mod domain;
pub mod error;
pub mod outgoing;
pub mod repositories;
pub mod services;

pub use domain::*;
pub use error::{SessionError, StoreError};
pub use outgoing::OutgoingCookie;
pub use repositories::SessionStore;
pub use services::{Session, SessionManager, SessionOptions, SessionStatus};
