//! Redis-backed session store

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use redis::RedisError;
use session_core::{SessionStore, StoreError};
use session_shared::config::StoreSettings;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::connection::RedisConnection;
use super::watchdog::ReconnectWatchdog;

const SCAN_BATCH: usize = 100;

pub struct RedisStore {
    prefix: String,
    conn: ConnectionManager,
    watchdog: Arc<ReconnectWatchdog>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl RedisStore {
    /// Connects and starts the health monitor. Fails if the first
    /// connection cannot be established.
    pub async fn connect(settings: &StoreSettings) -> Result<Self, StoreError> {
        let target = RedisConnection::from_settings(&settings.redis)?;
        let client = redis::Client::open(target.url())
            .map_err(|e| StoreError::InvalidSettings(e.to_string()))?;

        let conn = client.get_connection_manager().await.map_err(unavailable)?;
        info!(
            endpoint = %target.display_target(),
            prefix = %settings.prefix,
            "Redis connection established"
        );

        let watchdog = Arc::new(ReconnectWatchdog::new(Duration::from_millis(
            settings.reconnect_timeout_ms,
        )));
        let monitor = tokio::spawn(monitor_connection(
            conn.clone(),
            Arc::clone(&watchdog),
            Duration::from_millis(settings.health_check_interval_ms),
        ));

        Ok(Self {
            prefix: settings.prefix.clone(),
            conn,
            watchdog,
            monitor: Mutex::new(Some(monitor)),
        })
    }

    pub fn watchdog(&self) -> &Arc<ReconnectWatchdog> {
        &self.watchdog
    }

    fn observe<T>(&self, result: Result<T, RedisError>) -> Result<T, StoreError> {
        match result {
            Ok(value) => {
                self.watchdog.clear();
                Ok(value)
            }
            Err(e) => {
                warn!(error = %e, "Redis operation failed");
                self.watchdog.arm();
                Err(unavailable(e))
            }
        }
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, RedisError> {
        let mut conn = self.conn.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    async fn set(&self, key: &str, value: &str, ttl_ms: Option<u64>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl_ms {
            cmd.arg("PX").arg(ttl);
        }
        let result = cmd.query_async::<()>(&mut conn).await;
        self.observe(result)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let result = redis::cmd("GET")
            .arg(key)
            .query_async::<Option<String>>(&mut conn)
            .await;
        self.observe(result)
    }

    async fn delete(&self, pattern: &str) -> Result<u64, StoreError> {
        let keys = self.scan_keys(pattern).await;
        let keys = self.observe(keys)?;
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.clone();
        let result = redis::cmd("DEL")
            .arg(&keys)
            .query_async::<u64>(&mut conn)
            .await;
        let removed = self.observe(result)?;
        debug!(pattern, removed, "deleted session keys");
        Ok(removed)
    }

    async fn close(&self) -> Result<(), StoreError> {
        if let Some(monitor) = self.monitor.lock().take() {
            monitor.abort();
        }
        self.watchdog.clear();
        info!("Redis connection closed");
        Ok(())
    }
}

impl Drop for RedisStore {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.get_mut().take() {
            monitor.abort();
        }
    }
}

/// Pings the backend every `interval`. A failed ping arms the watchdog. A
/// successful one clears it, including a countdown armed by a failed
/// command while the connection itself stayed up.
async fn monitor_connection(
    mut conn: ConnectionManager,
    watchdog: Arc<ReconnectWatchdog>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut connected = true;

    loop {
        ticker.tick().await;
        match redis::cmd("PING").query_async::<String>(&mut conn).await {
            Ok(_) => {
                if !connected {
                    info!("Redis connection status: reconnected");
                    connected = true;
                }
                if watchdog.is_armed() {
                    watchdog.clear();
                }
            }
            Err(e) => {
                if connected {
                    warn!(error = %e, "Redis connection status: disconnected");
                    connected = false;
                }
                watchdog.arm();
            }
        }
    }
}

fn unavailable(e: RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}
