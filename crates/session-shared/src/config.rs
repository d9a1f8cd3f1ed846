//! Configuration management

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{
    DEFAULT_COOKIE_NAME, DEFAULT_COOKIE_PATH, DEFAULT_HEALTH_CHECK_INTERVAL_MS,
    DEFAULT_RECONNECT_TIMEOUT_MS, DEFAULT_STORE_PREFIX,
};
use crate::error::AppError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub session: SessionSettings,
    pub store: StoreSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub name: String,
}

/// Options recognized by the session manager.
#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    /// Cookie name carrying the encrypted identifier
    pub name: String,
    pub secret: String,
    #[serde(default)]
    pub resave: bool,
    #[serde(default)]
    pub save_uninitialized: bool,
    /// Reuse a decrypted identifier whose record has expired
    #[serde(default = "default_true")]
    pub reuse_stale_id: bool,
    #[serde(default)]
    pub cookie: CookieSettings,
}

/// Overrides applied on top of the default cookie attributes.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CookieSettings {
    pub path: Option<String>,
    pub http_only: Option<bool>,
    pub secure: Option<bool>,
    pub domain: Option<String>,
    pub max_age_ms: Option<i64>,
    pub same_site: Option<SameSite>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Namespace prepended to every generated identifier
    pub prefix: String,
    pub reconnect_timeout_ms: u64,
    pub health_check_interval_ms: u64,
    #[serde(default)]
    pub redis: RedisSettings,
}

/// Redis connection parameters. Which combination is coherent is decided
/// by the store adapter when it connects.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisSettings {
    /// Unix socket path
    pub path: Option<String>,
    pub port: Option<u16>,
    pub host: Option<String>,
    pub options: Option<RedisOptions>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisOptions {
    pub username: Option<String>,
    pub password: Option<String>,
    pub db: Option<i64>,
    #[serde(default)]
    pub tls: bool,
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let builder = Self::with_defaults(Config::builder())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__").try_parsing(true));
        debug!(
            env = %env,
            "loading configuration: defaults, config/default, config/{}, APP__* variables",
            env
        );

        let cfg = Self::from_config(builder.build()?)?;
        debug!(
            backend = ?cfg.store.backend,
            prefix = %cfg.store.prefix,
            cookie = %cfg.session.name,
            "configuration loaded"
        );
        Ok(cfg)
    }

    pub fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, AppError> {
        Ok(builder
            .set_default("app.env", "development")?
            .set_default("app.host", "127.0.0.1")?
            .set_default("app.port", 8080)?
            .set_default("app.name", "session-server")?
            .set_default("session.name", DEFAULT_COOKIE_NAME)?
            .set_default("store.backend", "redis")?
            .set_default("store.prefix", DEFAULT_STORE_PREFIX)?
            .set_default("store.reconnect_timeout_ms", DEFAULT_RECONNECT_TIMEOUT_MS as i64)?
            .set_default(
                "store.health_check_interval_ms",
                DEFAULT_HEALTH_CHECK_INTERVAL_MS as i64,
            )?)
    }

    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let cfg: AppConfig = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.session.secret.trim().is_empty() {
            return Err(AppError::InvalidConfig("session.secret must not be empty".into()));
        }
        if self.session.name.is_empty() {
            return Err(AppError::InvalidConfig("session.name must not be empty".into()));
        }
        if self.store.reconnect_timeout_ms == 0 {
            return Err(AppError::InvalidConfig("store.reconnect_timeout_ms must be positive".into()));
        }
        if self.store.health_check_interval_ms == 0 {
            return Err(AppError::InvalidConfig(
                "store.health_check_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl CookieSettings {
    pub fn path_or_default(&self) -> String {
        self.path.clone().unwrap_or_else(|| DEFAULT_COOKIE_PATH.to_string())
    }
}
