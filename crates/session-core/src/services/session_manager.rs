// ============================================================================
// Session Core - Session Manager
// File: crates/session-core/src/services/session_manager.rs
// ============================================================================
//! Per-request identity resolution and the write-through persist routine

use std::sync::Arc;

use chrono::Utc;
use session_security::{ChaChaCipher, CookieCipher, IdGenerator, RandomHexId, RequestContext};
use session_shared::config::SessionSettings;
use session_shared::constants::{DEFAULT_COOKIE_NAME, DEFAULT_ID_BYTES};
use tracing::{debug, warn};

use super::session::{Session, SessionInner, SessionStatus};
use crate::domain::{CookieAttributes, SessionId, SessionState, StoreRecord, Ttl};
use crate::error::SessionError;
use crate::outgoing::{find_cookie, OutgoingCookie};
use crate::repositories::{escape_pattern, SessionStore};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Cookie name carrying the encrypted identifier
    pub name: String,
    /// Re-write resolved sessions that saw no mutation
    pub resave: bool,
    /// Write fresh sessions that saw no mutation
    pub save_uninitialized: bool,
    /// Keep a decrypted identifier whose record is gone and reuse it on write
    pub reuse_stale_id: bool,
    /// Attributes every fresh session starts with
    pub cookie: CookieAttributes,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            resave: false,
            save_uninitialized: false,
            reuse_stale_id: true,
            cookie: CookieAttributes::default(),
        }
    }
}

impl SessionOptions {
    pub fn from_settings(settings: &SessionSettings) -> Result<Self, SessionError> {
        if settings.name.is_empty() {
            return Err(SessionError::Config("cookie name must not be empty".into()));
        }

        let overrides = &settings.cookie;
        let mut cookie = CookieAttributes::default();
        cookie.set_path(overrides.path_or_default());
        if let Some(http_only) = overrides.http_only {
            cookie.set_http_only(http_only);
        }
        if let Some(secure) = overrides.secure {
            cookie.set_secure(secure);
        }
        cookie.set_domain(overrides.domain.clone());
        cookie.set_max_age(overrides.max_age_ms);
        cookie.set_same_site(overrides.same_site);

        Ok(Self {
            name: settings.name.clone(),
            resave: settings.resave,
            save_uninitialized: settings.save_uninitialized,
            reuse_stale_id: settings.reuse_stale_id,
            cookie,
        })
    }
}

/// Resolves sessions from request cookies and persists them on mutation.
///
/// Cheap to clone; every [`Session`] it hands out keeps a clone.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

#[derive(Clone)]
struct ManagerInner {
    options: SessionOptions,
    store: Arc<dyn SessionStore>,
    cipher: Arc<dyn CookieCipher>,
    id_generator: Arc<dyn IdGenerator>,
}

impl SessionManager {
    pub fn new(
        options: SessionOptions,
        store: Arc<dyn SessionStore>,
        cipher: Arc<dyn CookieCipher>,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                options,
                store,
                cipher,
                id_generator: Arc::new(RandomHexId::new(DEFAULT_ID_BYTES)),
            }),
        }
    }

    pub fn from_settings(
        settings: &SessionSettings,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, SessionError> {
        if settings.secret.is_empty() {
            return Err(SessionError::Config("secret must not be empty".into()));
        }
        let options = SessionOptions::from_settings(settings)?;
        Ok(Self::new(options, store, Arc::new(ChaChaCipher::new(&settings.secret))))
    }

    /// Replaces the identifier generator.
    pub fn with_id_generator(self, id_generator: impl IdGenerator + 'static) -> Self {
        let mut inner = Arc::try_unwrap(self.inner).unwrap_or_else(|shared| (*shared).clone());
        inner.id_generator = Arc::new(id_generator);
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.inner.options
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.inner.store
    }

    /// Builds the request's session from its `Cookie` header.
    ///
    /// Undecryptable cookies and missing or unreadable records all yield an
    /// unresolved session with default attributes. Only store failures are
    /// returned as errors.
    pub async fn load(
        &self,
        cookie_header: Option<&str>,
        context: RequestContext,
    ) -> Result<Session, SessionError> {
        let options = &self.inner.options;
        let mut inner = SessionInner {
            id: None,
            state: SessionState::new(options.cookie.clone()),
            status: SessionStatus::Unresolved,
            context,
            outgoing: None,
            writes: 0,
            attempted: false,
            destroyed: false,
        };

        if let Some(id) = cookie_header.and_then(|header| self.presented_identifier(header)) {
            match self.inner.store.get(id.as_str()).await? {
                Some(raw) => match serde_json::from_str::<SessionState>(&raw) {
                    Ok(state) => {
                        debug!(session_id = %id, "session resolved");
                        inner.state = state;
                        inner.status = SessionStatus::Resolved;
                        inner.id = Some(id);
                    }
                    Err(e) => {
                        warn!(session_id = %id, error = %e, "discarding unreadable session record");
                        if options.reuse_stale_id {
                            inner.id = Some(id);
                        }
                    }
                },
                None => {
                    debug!(session_id = %id, "no stored record for presented session");
                    if options.reuse_stale_id {
                        inner.id = Some(id);
                    }
                }
            }
        }

        Ok(Session::new(self.clone(), inner))
    }

    /// End-of-request policy for sessions no handler mutated: `resave`
    /// refreshes resolved sessions, `save_uninitialized` stores fresh ones.
    /// A request whose mutation already hit the store, successfully or not,
    /// is left alone.
    pub async fn finish(&self, session: &Session) -> Result<(), SessionError> {
        let mut inner = session.lock().await;
        if inner.attempted || inner.writes > 0 || inner.destroyed {
            return Ok(());
        }

        let save = match inner.status {
            SessionStatus::Resolved => self.inner.options.resave,
            SessionStatus::Unresolved => self.inner.options.save_uninitialized,
        };
        if save {
            self.persist(&mut inner).await?;
        }
        Ok(())
    }

    /// Cookie instructing the client to drop its session cookie.
    pub fn removal_cookie(&self) -> OutgoingCookie {
        OutgoingCookie::removal(&self.inner.options.name, &self.inner.options.cookie)
    }

    pub(crate) async fn destroy(&self, inner: &mut SessionInner) -> Result<(), SessionError> {
        if let Some(id) = inner.id.take() {
            let removed = self.inner.store.delete(&escape_pattern(id.as_str())).await?;
            debug!(session_id = %id, removed, "session destroyed");
        }
        inner.state = SessionState::new(self.inner.options.cookie.clone());
        inner.status = SessionStatus::Unresolved;
        inner.outgoing = Some(self.removal_cookie());
        inner.destroyed = true;
        Ok(())
    }

    fn presented_identifier(&self, header: &str) -> Option<SessionId> {
        let sealed = find_cookie(header, &self.inner.options.name)?;
        match self.inner.cipher.decrypt(&sealed) {
            Ok(plain) => {
                let id = SessionId::parse(&plain, self.inner.store.prefix());
                if id.is_none() {
                    debug!("decrypted session identifier outside store namespace");
                }
                id
            }
            Err(e) => {
                debug!(error = %e, "ignoring undecryptable session cookie");
                None
            }
        }
    }

    fn allocate_id(&self, context: &RequestContext) -> SessionId {
        let random = self.inner.id_generator.generate(context);
        SessionId::new(self.inner.store.prefix(), &random)
    }

    /// The Dirty transition: allocate the identifier if needed, write the
    /// full state with a TTL taken at this instant, then emit the cookie.
    /// A failed write emits nothing.
    pub(crate) async fn persist(&self, inner: &mut SessionInner) -> Result<(), SessionError> {
        let id = match &inner.id {
            Some(id) => id.clone(),
            None => {
                let id = self.allocate_id(&inner.context);
                debug!(session_id = %id, "allocated session identifier");
                inner.id = Some(id.clone());
                id
            }
        };

        let record = StoreRecord::build(&id, &inner.state, Utc::now())?;
        let sealed = self.inner.cipher.encrypt(id.as_str())?;

        match record.ttl {
            Ttl::Expired => {
                debug!(session_id = %id, "session lifetime exhausted, removing record");
                self.inner.store.delete(&escape_pattern(id.as_str())).await?;
            }
            ttl => {
                self.inner
                    .store
                    .set(record.key.as_str(), &record.value, ttl.as_millis())
                    .await?;
                debug!(session_id = %id, ttl_ms = ?ttl.as_millis(), "session persisted");
            }
        }

        inner.outgoing = Some(OutgoingCookie::new(
            &self.inner.options.name,
            sealed,
            inner.state.cookie.clone(),
        ));
        inner.writes += 1;
        Ok(())
    }
}
