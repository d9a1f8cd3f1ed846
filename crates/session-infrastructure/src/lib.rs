//! # Session Infrastructure
//!
//! Store adapters for the session layer.

pub mod cache;
pub mod memory;

pub use cache::{ReconnectWatchdog, RedisConnection, RedisStore};
pub use memory::MemoryStore;
