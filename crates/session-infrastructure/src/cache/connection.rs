//! Redis connection target

use session_core::StoreError;
use session_shared::config::{RedisOptions, RedisSettings};
use session_shared::constants::{DEFAULT_REDIS_HOST, DEFAULT_REDIS_PORT};

/// Where the store connects. Built from [`RedisSettings`] once the field
/// combination has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedisEndpoint {
    Tcp { host: String, port: u16 },
    Unix { path: String },
}

#[derive(Debug, Clone)]
pub struct RedisConnection {
    endpoint: RedisEndpoint,
    options: RedisOptions,
}

impl RedisConnection {
    /// Accepted shapes: nothing (local default), `port`, `port` + `host`,
    /// or `path` alone. Any of them may carry `options`.
    pub fn from_settings(settings: &RedisSettings) -> Result<Self, StoreError> {
        let endpoint = match (&settings.path, settings.port, &settings.host) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err(StoreError::InvalidSettings(
                    "redis.path cannot be combined with redis.port or redis.host".into(),
                ));
            }
            (Some(path), None, None) if path.is_empty() => {
                return Err(StoreError::InvalidSettings("redis.path must not be empty".into()));
            }
            (Some(path), None, None) => RedisEndpoint::Unix { path: path.clone() },
            (None, None, Some(_)) => {
                return Err(StoreError::InvalidSettings("redis.host requires redis.port".into()));
            }
            (None, port, host) => RedisEndpoint::Tcp {
                host: host.clone().unwrap_or_else(|| DEFAULT_REDIS_HOST.to_string()),
                port: port.unwrap_or(DEFAULT_REDIS_PORT),
            },
        };

        let options = settings.options.clone().unwrap_or_default();
        if options.db.is_some_and(|db| db < 0) {
            return Err(StoreError::InvalidSettings("redis.options.db must not be negative".into()));
        }
        if options.tls && matches!(endpoint, RedisEndpoint::Unix { .. }) {
            return Err(StoreError::InvalidSettings(
                "redis.options.tls is not available over a unix socket".into(),
            ));
        }

        Ok(Self { endpoint, options })
    }

    pub fn endpoint(&self) -> &RedisEndpoint {
        &self.endpoint
    }

    /// Connection URL understood by `redis::Client::open`.
    pub fn url(&self) -> String {
        match &self.endpoint {
            RedisEndpoint::Tcp { host, port } => {
                let scheme = if self.options.tls { "rediss" } else { "redis" };
                let mut url = format!("{}://{}{}:{}", scheme, self.auth(), host, port);
                if let Some(db) = self.options.db {
                    url.push_str(&format!("/{}", db));
                }
                url
            }
            RedisEndpoint::Unix { path } => {
                // unix urls carry everything in the query string
                let mut query = Vec::new();
                if let Some(db) = self.options.db {
                    query.push(format!("db={}", db));
                }
                if let Some(user) = &self.options.username {
                    query.push(format!("user={}", urlencoding::encode(user)));
                }
                if let Some(password) = &self.options.password {
                    query.push(format!("pass={}", urlencoding::encode(password)));
                }
                let mut url = format!("redis+unix://{}", path);
                if !query.is_empty() {
                    url.push('?');
                    url.push_str(&query.join("&"));
                }
                url
            }
        }
    }

    /// Endpoint without credentials, for logs.
    pub fn display_target(&self) -> String {
        match &self.endpoint {
            RedisEndpoint::Tcp { host, port } => format!("{}:{}", host, port),
            RedisEndpoint::Unix { path } => path.clone(),
        }
    }

    fn auth(&self) -> String {
        let user = self.options.username.as_deref().map(urlencoding::encode);
        let password = self.options.password.as_deref().map(urlencoding::encode);
        match (user, password) {
            (Some(user), Some(password)) => format!("{}:{}@", user, password),
            (Some(user), None) => format!("{}@", user),
            (None, Some(password)) => format!(":{}@", password),
            (None, None) => String::new(),
        }
    }
}
