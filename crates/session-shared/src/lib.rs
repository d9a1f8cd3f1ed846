//! # Session Shared
//! 
//! Configuration, telemetry, and shared constants for the session layer.

pub mod constants;
pub mod telemetry;
pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::AppError;
