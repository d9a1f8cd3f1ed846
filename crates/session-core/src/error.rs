//! Session and store errors

use session_security::CipherError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend connection lost or operation rejected
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid store settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid key pattern: {0}")]
    InvalidPattern(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Session serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Session cookie encryption failed: {0}")]
    Encryption(#[from] CipherError),

    #[error("Reserved session field: {0}")]
    ReservedField(String),

    #[error("Invalid session configuration: {0}")]
    Config(String),
}
