// ============================
// sessiongate-backend/src/auth/session.rs
// ============================
//! Server-side sessions keyed by a random session id.
//!
//! `SessionManager` owns the store and performs the per-request lookup;
//! the resulting `SessionContext` is what handlers receive. It moves between
//! `Anonymous` and `Authenticated` and remembers which cookie the response
//! has to carry.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use metrics::{counter, gauge};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::token_generator::generate_session_id;
use crate::metrics as keys;
use crate::storage::User;

/// Default session TTL (time to live)
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24); // 1 day

/// Session information
#[derive(Debug, Clone)]
pub struct Session {
    /// Snapshot of the user taken at login
    pub user: User,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user: User, ttl: Duration) -> Self {
        let now = Utc::now();
        // Saturate instead of overflowing the calendar
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            user,
            created_at: now,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Faults raised by a session store backend
#[derive(Error, Debug)]
pub enum SessionStoreError {
    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}

/// Session failures seen by the auth layer
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session store error: {0}")]
    Store(#[from] SessionStoreError),

    /// The store failed to clear a session that did exist
    #[error("Session teardown failed: {0}")]
    Teardown(#[source] SessionStoreError),
}

/// Trait for session storage backends
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a live session. Expired sessions are reported as absent.
    async fn load(&self, id: &str) -> Result<Option<Session>, SessionStoreError>;

    /// Insert or replace the session stored under `id`
    async fn save(&self, id: &str, session: Session) -> Result<(), SessionStoreError>;

    /// Remove a session, returning whether one was stored
    async fn remove(&self, id: &str) -> Result<bool, SessionStoreError>;

    /// Drop every expired session, returning how many were dropped
    async fn purge_expired(&self) -> Result<usize, SessionStoreError>;
}

/// In-memory session store.
///
/// `DashMap` locks per shard, so writes to one key never run concurrently.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn report_active(&self) {
        gauge!(keys::SESSION_ACTIVE).set(self.sessions.len() as f64);
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> Result<Option<Session>, SessionStoreError> {
        let now = Utc::now();
        // Clone out before touching the map again; holding the ref would deadlock
        let found = self.sessions.get(id).map(|entry| entry.value().clone());
        match found {
            Some(session) if session.is_expired(now) => {
                self.sessions.remove_if(id, |_, s| s.is_expired(now));
                counter!(keys::SESSION_EXPIRED).increment(1);
                self.report_active();
                Ok(None)
            },
            other => Ok(other),
        }
    }

    async fn save(&self, id: &str, session: Session) -> Result<(), SessionStoreError> {
        self.sessions.insert(id.to_string(), session);
        self.report_active();
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool, SessionStoreError> {
        let removed = self.sessions.remove(id).is_some();
        self.report_active();
        Ok(removed)
    }

    async fn purge_expired(&self) -> Result<usize, SessionStoreError> {
        let now = Utc::now();
        let before_count = self.sessions.len();

        self.sessions.retain(|_, session| !session.is_expired(now));

        let after_count = self.sessions.len();
        let removed = before_count.saturating_sub(after_count);
        if removed > 0 {
            counter!(keys::SESSION_EXPIRED).increment(removed as u64);
        }
        self.report_active();
        Ok(removed)
    }
}

/// Session manager for looking up and expiring sessions
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionManager {
    /// Create a new session manager over an arbitrary store
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Create a session manager backed by a fresh `MemorySessionStore`
    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(MemorySessionStore::new()), ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Context for a request that presented no session id
    pub fn anonymous(&self) -> SessionContext {
        SessionContext::new(self.clone(), ContextState::default())
    }

    /// Resolve the session id a request presented into its context.
    ///
    /// Unknown or expired ids yield an anonymous context that clears the
    /// client's cookie.
    pub async fn context_for(&self, session_id: Option<&str>) -> Result<SessionContext, SessionError> {
        let Some(id) = session_id else {
            return Ok(self.anonymous());
        };

        match self.store.load(id).await? {
            Some(session) => Ok(SessionContext::new(
                self.clone(),
                ContextState {
                    id: Some(id.to_string()),
                    user: Some(session.user),
                    cookie: CookieChange::Unchanged,
                },
            )),
            None => {
                debug!("request presented an unknown or expired session id");
                Ok(SessionContext::new(
                    self.clone(),
                    ContextState {
                        cookie: CookieChange::Clear,
                        ..ContextState::default()
                    },
                ))
            },
        }
    }

    /// Remove expired sessions now
    pub async fn purge_expired(&self) -> Result<usize, SessionError> {
        Ok(self.store.purge_expired().await?)
    }

    /// Spawn the task that periodically removes expired sessions.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_cleanup_task(&self, every: Duration) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match manager.purge_expired().await {
                    Ok(0) => {},
                    Ok(removed) => debug!(removed, "purged expired sessions"),
                    Err(e) => warn!(error = %e, "session purge failed"),
                }
            }
        })
    }
}

/// Cookie instruction the response has to carry
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CookieChange {
    #[default]
    Unchanged,
    /// Send this new session id to the client
    Issue(String),
    /// Expire the client's session cookie
    Clear,
}

/// Public view of a context's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(User),
}

/// Result of `SessionContext::destroy`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    Destroyed,
    NoSession,
}

#[derive(Debug, Default)]
struct ContextState {
    id: Option<String>,
    user: Option<User>,
    cookie: CookieChange,
}

/// Per-request session context.
///
/// Clones share state, so the middleware that created it sees what the
/// handler did.
#[derive(Clone)]
pub struct SessionContext {
    manager: SessionManager,
    state: Arc<Mutex<ContextState>>,
}

impl SessionContext {
    fn new(manager: SessionManager, state: ContextState) -> Self {
        Self {
            manager,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// The authenticated principal, if any
    pub fn current(&self) -> Option<User> {
        self.state.lock().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.lock().user.is_some()
    }

    pub fn state(&self) -> SessionState {
        match self.current() {
            Some(user) => SessionState::Authenticated(user),
            None => SessionState::Anonymous,
        }
    }

    /// Id of the session this request is bound to
    pub fn session_id(&self) -> Option<String> {
        self.state.lock().id.clone()
    }

    pub fn cookie_change(&self) -> CookieChange {
        self.state.lock().cookie.clone()
    }

    /// Establish a session holding `user`.
    ///
    /// A fresh id is issued every time; a previous session bound to this
    /// request is removed, so re-login replaces the snapshot.
    pub async fn create(&self, user: User) -> Result<(), SessionError> {
        let previous = self.state.lock().id.clone();

        let id = generate_session_id();
        let session = Session::new(user.clone(), self.manager.ttl);
        self.manager.store.save(&id, session).await?;

        if let Some(old_id) = previous {
            if let Err(e) = self.manager.store.remove(&old_id).await {
                warn!(error = %e, "failed to remove replaced session");
            }
        }

        let user_id = user.id;
        {
            let mut state = self.state.lock();
            state.id = Some(id.clone());
            state.user = Some(user);
            state.cookie = CookieChange::Issue(id);
        }

        counter!(keys::SESSION_CREATED).increment(1);
        info!(user_id, "session established");
        Ok(())
    }

    /// End the session, if there is one.
    ///
    /// Destroying an absent session is not a failure.
    pub async fn destroy(&self) -> Result<DestroyOutcome, SessionError> {
        let id = {
            let state = self.state.lock();
            match (&state.id, &state.user) {
                (Some(id), Some(_)) => id.clone(),
                _ => return Ok(DestroyOutcome::NoSession),
            }
        };

        self.manager
            .store
            .remove(&id)
            .await
            .map_err(SessionError::Teardown)?;

        {
            let mut state = self.state.lock();
            state.id = None;
            state.user = None;
            state.cookie = CookieChange::Clear;
        }

        counter!(keys::SESSION_DESTROYED).increment(1);
        info!("session destroyed");
        Ok(DestroyOutcome::Destroyed)
    }
}
