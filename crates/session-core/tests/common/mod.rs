//! In-memory store that records every call, for manager tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use session_core::{SessionStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Set { key: String, value: String, ttl_ms: Option<u64> },
    Get { key: String },
    Delete { pattern: String },
}

#[derive(Default)]
pub struct RecordingStore {
    pub records: Mutex<HashMap<String, String>>,
    pub calls: Mutex<Vec<Call>>,
    failing_sets: Mutex<usize>,
}

impl RecordingStore {
    pub fn with_record(key: &str, value: &str) -> Self {
        let store = Self::default();
        store.records.lock().insert(key.to_string(), value.to_string());
        store
    }

    pub fn sets(&self) -> Vec<(String, String, Option<u64>)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Set { key, value, ttl_ms } => Some((key.clone(), value.clone(), *ttl_ms)),
                _ => None,
            })
            .collect()
    }

    /// The next `n` writes are refused without being recorded.
    pub fn fail_next_sets(&self, n: usize) {
        *self.failing_sets.lock() = n;
    }

    pub fn record(&self, key: &str) -> Option<String> {
        self.records.lock().get(key).cloned()
    }
}

#[async_trait]
impl SessionStore for RecordingStore {
    fn prefix(&self) -> &str {
        "sess:"
    }

    async fn set(&self, key: &str, value: &str, ttl_ms: Option<u64>) -> Result<(), StoreError> {
        {
            let mut failing = self.failing_sets.lock();
            if *failing > 0 {
                *failing -= 1;
                return Err(StoreError::Unavailable("write refused".into()));
            }
        }
        self.calls.lock().push(Call::Set {
            key: key.to_string(),
            value: value.to_string(),
            ttl_ms,
        });
        self.records.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.calls.lock().push(Call::Get { key: key.to_string() });
        Ok(self.records.lock().get(key).cloned())
    }

    async fn delete(&self, pattern: &str) -> Result<u64, StoreError> {
        self.calls.lock().push(Call::Delete { pattern: pattern.to_string() });
        Ok(self.records.lock().remove(pattern).map(|_| 1).unwrap_or(0))
    }
}
