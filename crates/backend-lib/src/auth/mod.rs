// ============================
// sessiongate-backend/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod password;
pub mod session;
pub mod token_generator;
mod service;
mod service_impl;

pub use password::{
    hash_password, verify_password, CredentialError, PasswordPolicy, DEFAULT_HASH_COST,
    MAX_HASH_COST,
};
pub use service::{AuthService, LogoutOutcome};
pub use service_impl::DefaultAuth;
pub use session::{
    CookieChange, DestroyOutcome, MemorySessionStore, Session, SessionContext, SessionError,
    SessionManager, SessionState, SessionStore, SessionStoreError, SESSION_TTL,
};
