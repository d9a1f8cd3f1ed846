//! # Session Core - Domain Module
//! 
//! Session state, cookie attributes, and the TTL policy derived from them.

pub mod attributes;
pub mod state;
pub mod ttl;

pub use attributes::{CookieAttributes, CookieField, CookieUpdate, SameSite};
pub use state::{SessionId, SessionState, StoreRecord, UserRef};
pub use ttl::Ttl;
