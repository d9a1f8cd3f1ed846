//! Request-scoped session handle
//!
//! The handle exposes no raw mutable state. Every setter applies its change
//! and persists (cookie + store write) before returning, so `N` setter calls
//! cost `N` writes. `modify`, `update_cookie` and `replace` batch several
//! changes into a single write. A mutation whose closure or write fails
//! leaves the session as it was.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use session_security::RequestContext;
use tokio::sync::{Mutex, MutexGuard};

use super::session_manager::SessionManager;
use crate::domain::{CookieAttributes, CookieUpdate, SameSite, SessionId, SessionState, UserRef};
use crate::error::SessionError;
use crate::outgoing::OutgoingCookie;

/// How the session was found when the request arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No usable cookie or no stored record; started from defaults.
    Unresolved,
    /// Loaded from the store.
    Resolved,
}

pub(crate) struct SessionInner {
    pub(crate) id: Option<SessionId>,
    pub(crate) state: SessionState,
    pub(crate) status: SessionStatus,
    pub(crate) context: RequestContext,
    pub(crate) outgoing: Option<OutgoingCookie>,
    pub(crate) writes: usize,
    /// A mutation reached the store, whether or not the write succeeded.
    pub(crate) attempted: bool,
    pub(crate) destroyed: bool,
}

#[derive(Clone)]
pub struct Session {
    manager: SessionManager,
    inner: Arc<Mutex<SessionInner>>,
}

impl Session {
    pub(crate) fn new(manager: SessionManager, inner: SessionInner) -> Self {
        Self {
            manager,
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().await
    }

    // --- Reads (never persist) ---

    /// `None` until the first write allocates one, unless a stale
    /// identifier was kept from the request cookie.
    pub async fn id(&self) -> Option<SessionId> {
        self.inner.lock().await.id.clone()
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.lock().await.status
    }

    pub async fn user(&self) -> Option<UserRef> {
        self.inner.lock().await.state.user.clone()
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        self.inner.lock().await.state.get(key)
    }

    pub async fn cookie(&self) -> CookieAttributes {
        self.inner.lock().await.state.cookie.clone()
    }

    pub async fn snapshot(&self) -> SessionState {
        self.inner.lock().await.state.clone()
    }

    /// The cookie emitted by the most recent write, if any.
    pub async fn outgoing_cookie(&self) -> Option<OutgoingCookie> {
        self.inner.lock().await.outgoing.clone()
    }

    /// Number of store writes this handle has triggered.
    pub async fn write_count(&self) -> usize {
        self.inner.lock().await.writes
    }

    // --- Session fields ---

    pub async fn set_user(&self, user: UserRef) -> Result<(), SessionError> {
        self.mutate(|state| {
            state.user = Some(user);
            Ok(())
        })
        .await
    }

    pub async fn clear_user(&self) -> Result<(), SessionError> {
        self.mutate(|state| {
            state.user = None;
            Ok(())
        })
        .await
    }

    /// Stores an application field. `cookie` and `user` are reserved.
    pub async fn insert<T: Serialize + Send>(
        &self,
        key: &str,
        value: T,
    ) -> Result<Option<Value>, SessionError> {
        self.mutate(|state| state.insert(key, value)).await
    }

    pub async fn remove(&self, key: &str) -> Result<Option<Value>, SessionError> {
        self.mutate(|state| Ok(state.remove(key))).await
    }

    // --- Cookie attributes ---

    pub async fn set_path(&self, path: impl Into<String> + Send) -> Result<(), SessionError> {
        self.mutate_cookie(|cookie| cookie.set_path(path)).await
    }

    pub async fn set_http_only(&self, http_only: bool) -> Result<(), SessionError> {
        self.mutate_cookie(|cookie| cookie.set_http_only(http_only)).await
    }

    pub async fn set_secure(&self, secure: bool) -> Result<(), SessionError> {
        self.mutate_cookie(|cookie| cookie.set_secure(secure)).await
    }

    pub async fn set_domain(&self, domain: Option<String>) -> Result<(), SessionError> {
        self.mutate_cookie(|cookie| cookie.set_domain(domain)).await
    }

    pub async fn set_same_site(&self, same_site: Option<SameSite>) -> Result<(), SessionError> {
        self.mutate_cookie(|cookie| cookie.set_same_site(same_site)).await
    }

    /// Clears `max_age` when `Some`.
    pub async fn set_expires(&self, expires: Option<DateTime<Utc>>) -> Result<(), SessionError> {
        self.mutate_cookie(|cookie| cookie.set_expires(expires)).await
    }

    /// Milliseconds. Clears `expires` when `Some`.
    pub async fn set_max_age(&self, max_age: Option<i64>) -> Result<(), SessionError> {
        self.mutate_cookie(|cookie| cookie.set_max_age(max_age)).await
    }

    /// Merges `update` into the current attributes in declaration order.
    pub async fn update_cookie(&self, update: CookieUpdate) -> Result<(), SessionError> {
        self.mutate_cookie(|cookie| cookie.apply(&update)).await
    }

    /// Removes the stored record and answers with a removal cookie. The
    /// handle restarts from defaults; a later mutation allocates a new
    /// identifier.
    pub async fn destroy(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        self.manager.destroy(&mut inner).await
    }

    // --- Batched writes ---

    /// Applies any number of changes, then persists once.
    pub async fn modify<F, R>(&self, apply: F) -> Result<R, SessionError>
    where
        F: FnOnce(&mut SessionState) -> Result<R, SessionError> + Send,
        R: Send,
    {
        self.mutate(apply).await
    }

    /// Swaps the whole state, cookie attributes included.
    pub async fn replace(&self, state: SessionState) -> Result<(), SessionError> {
        self.mutate(|current| {
            *current = state;
            Ok(())
        })
        .await
    }

    async fn mutate_cookie<F>(&self, apply: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut CookieAttributes) + Send,
    {
        self.mutate(|state| {
            apply(&mut state.cookie);
            Ok(())
        })
        .await
    }

    async fn mutate<F, R>(&self, apply: F) -> Result<R, SessionError>
    where
        F: FnOnce(&mut SessionState) -> Result<R, SessionError> + Send,
        R: Send,
    {
        let mut inner = self.inner.lock().await;
        // changes land on a draft and become visible only once written
        let mut draft = inner.state.clone();
        let out = apply(&mut draft)?;

        let previous = std::mem::replace(&mut inner.state, draft);
        inner.attempted = true;
        if let Err(e) = self.manager.persist(&mut inner).await {
            inner.state = previous;
            return Err(e);
        }
        Ok(out)
    }
}
