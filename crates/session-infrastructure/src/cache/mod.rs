//! Redis adapter

pub mod connection;
pub mod redis_store;
pub mod watchdog;

pub use connection::{RedisConnection, RedisEndpoint};
pub use redis_store::RedisStore;
pub use watchdog::ReconnectWatchdog;
