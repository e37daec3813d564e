// ============================
// sessiongate-backend/src/lib.rs
// ============================
//! Core library of the `sessiongate` credential and session service.
//!
//! Register, log in, log out and list users over HTTP. Every mutating
//! operation sits behind a chain of validation gates; sessions are kept
//! server side and addressed by a random id in a cookie.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use crate::auth::{AuthService, DefaultAuth, SessionManager};
use crate::config::{Settings, StorageBackend};
use crate::storage::{FlatFileUserStore, MemoryUserStore, StorageError, UserStore};

pub use router::create_router;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Session manager
    pub sessions: SessionManager,
    /// Settings
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create application state over a user store, with in-memory sessions
    pub fn new(store: Arc<dyn UserStore>, settings: Settings) -> Self {
        let sessions = SessionManager::in_memory(settings.session_ttl());
        Self::with_sessions(store, sessions, settings)
    }

    /// Create application state with an explicit session manager
    pub fn with_sessions(
        store: Arc<dyn UserStore>,
        sessions: SessionManager,
        settings: Settings,
    ) -> Self {
        let auth = Arc::new(DefaultAuth::from_settings(store, &settings));
        Self {
            auth,
            sessions,
            settings: Arc::new(settings),
        }
    }

    /// Create application state with the store the settings select
    pub fn from_settings(settings: Settings) -> Result<Self, StorageError> {
        let store = open_store(&settings)?;
        Ok(Self::new(store, settings))
    }
}

/// Open the `UserStore` selected by `storage.backend`
pub fn open_store(settings: &Settings) -> Result<Arc<dyn UserStore>, StorageError> {
    let store: Arc<dyn UserStore> = match settings.storage.backend {
        StorageBackend::Memory => Arc::new(MemoryUserStore::new()),
        StorageBackend::File => Arc::new(FlatFileUserStore::new(&settings.storage.path)?),
    };
    Ok(store)
}
