//! In-process session store

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use session_core::{SessionStore, StoreError};
use tokio::task::JoinHandle;
use tracing::debug;

use super::entry::Entry;
use super::pattern::glob_to_regex;

/// Concurrent map with per-entry absolute expiry. Expired entries are
/// dropped when read, swept by `delete`, or purged by the sweeper task.
pub struct MemoryStore {
    prefix: String,
    map: DashMap<String, Entry>,
}

impl MemoryStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            map: DashMap::new(),
        }
    }

    /// Live entries only.
    pub fn len(&self) -> usize {
        let now = now_ms();
        self.map.iter().filter(|r| !r.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = now_ms();
        let before = self.map.len();
        self.map.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.map.len())
    }

    /// Purges expired entries every `interval` until the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let purged = store.purge_expired();
                if purged > 0 {
                    debug!(purged, "swept expired session entries");
                }
            }
        })
    }

    /// Remaining lifetime of `key`; `Some(None)` for a record without expiry.
    pub fn ttl_remaining(&self, key: &str) -> Option<Option<u64>> {
        let now = now_ms();
        let entry = self.map.get(key)?;
        if entry.is_expired(now) {
            return None;
        }
        Some(match entry.expires_at_ms {
            0 => None,
            at => Some(at.saturating_sub(now)),
        })
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    async fn set(&self, key: &str, value: &str, ttl_ms: Option<u64>) -> Result<(), StoreError> {
        self.map
            .insert(key.to_string(), Entry::new(value.to_string(), ttl_ms, now_ms()));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = now_ms();
        let Some(entry) = self.map.get(key) else {
            return Ok(None);
        };
        if entry.is_expired(now) {
            drop(entry);
            self.map.remove_if(key, |_, e| e.is_expired(now));
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }

    async fn delete(&self, pattern: &str) -> Result<u64, StoreError> {
        let matcher = glob_to_regex(pattern)?;
        let now = now_ms();
        let mut removed = 0;
        self.map.retain(|key, entry| {
            if entry.is_expired(now) {
                return false;
            }
            if matcher.is_match(key) {
                removed += 1;
                return false;
            }
            true
        });
        debug!(pattern, removed, "deleted session keys");
        Ok(removed)
    }
}

fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}
