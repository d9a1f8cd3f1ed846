//! Session state and its store record

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::attributes::CookieAttributes;
use super::ttl::Ttl;
use crate::error::SessionError;

/// Keys owned by the session itself; application data may not use them.
const RESERVED_FIELDS: &[&str] = &["cookie", "user"];

/// Store key naming a session record: `prefix + random part`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(prefix: &str, random: &str) -> Self {
        Self(format!("{}{}", prefix, random))
    }

    /// Accepts a decrypted identifier only if it lives in the store namespace.
    pub fn parse(raw: &str, prefix: &str) -> Option<Self> {
        match raw.strip_prefix(prefix) {
            Some(rest) if !rest.is_empty() => Some(Self(raw.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
}

impl UserRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Everything persisted under a session identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub cookie: CookieAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
    #[serde(flatten)]
    data: Map<String, Value>,
}

impl SessionState {
    pub fn new(cookie: CookieAttributes) -> Self {
        Self {
            cookie,
            user: None,
            data: Map::new(),
        }
    }

    /// Application fields other than `cookie` and `user`.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        match self.data.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    pub fn insert<T: Serialize>(&mut self, key: &str, value: T) -> Result<Option<Value>, SessionError> {
        if RESERVED_FIELDS.contains(&key) {
            return Err(SessionError::ReservedField(key.to_string()));
        }
        let value = serde_json::to_value(value)?;
        Ok(self.data.insert(key.to_string(), value))
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// `(key, serialized state, ttl)` as handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRecord {
    pub key: SessionId,
    pub value: String,
    pub ttl: Ttl,
}

impl StoreRecord {
    /// Serializes `state` and derives the TTL from its cookie at `now`.
    pub fn build(key: &SessionId, state: &SessionState, now: DateTime<Utc>) -> Result<Self, SessionError> {
        Ok(Self {
            key: key.clone(),
            value: state.to_json()?,
            ttl: Ttl::compute(&state.cookie, now),
        })
    }
}
