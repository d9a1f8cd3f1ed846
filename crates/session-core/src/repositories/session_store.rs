//! Session store trait (port)

use async_trait::async_trait;

use crate::error::StoreError;

/// Namespaced key-value persistence with optional per-key expiry.
///
/// Implementations own no session semantics. Failures propagate to the
/// caller; nothing is retried internally.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Namespace prepended to generated session identifiers.
    fn prefix(&self) -> &str;

    /// Writes `value` under `key`, expiring after `ttl_ms` when given.
    async fn set(&self, key: &str, value: &str, ttl_ms: Option<u64>) -> Result<(), StoreError>;

    /// Returns `None` when the key is missing or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Removes every key matching the glob `pattern` (`*`, `?`, `\` escapes).
    /// Returns the number of removed keys; zero matches is not an error.
    async fn delete(&self, pattern: &str) -> Result<u64, StoreError>;

    /// Closes the backend connection.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Escapes glob metacharacters so `key` matches only itself in `delete`.
pub fn escape_pattern(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for c in key.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
