//! Session-wide constants

pub const DEFAULT_COOKIE_NAME: &str = "session:";
pub const DEFAULT_COOKIE_PATH: &str = "/";
pub const DEFAULT_STORE_PREFIX: &str = "sess:";
pub const DEFAULT_ID_BYTES: usize = 10;
pub const DEFAULT_RECONNECT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_HEALTH_CHECK_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_REDIS_HOST: &str = "127.0.0.1";
pub const DEFAULT_REDIS_PORT: u16 = 6379;
pub const DEFAULT_MEMORY_SWEEP_INTERVAL_MS: u64 = 60_000;
