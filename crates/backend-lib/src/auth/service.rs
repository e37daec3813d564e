use async_trait::async_trait;
use sessiongate_common::{Credentials, PublicUser};

use super::SessionContext;
use crate::error::AppError;
use crate::storage::User;

/// What `logout` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    LoggedOut,
    NoSession,
}

impl LogoutOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            LogoutOutcome::LoggedOut => "logged out",
            LogoutOutcome::NoSession => "no session found",
        }
    }
}

/// The four account operations, each behind its gate chain
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an account and return its public fields
    async fn register(&self, credentials: Credentials) -> Result<PublicUser, AppError>;

    /// Verify credentials and establish a session on `session`
    async fn login(&self, credentials: Credentials, session: &SessionContext) -> Result<User, AppError>;

    /// End the session, if any. Never fails for an anonymous caller.
    async fn logout(&self, session: &SessionContext) -> Result<LogoutOutcome, AppError>;

    /// All users' public fields; requires an authenticated session
    async fn list_users(&self, session: &SessionContext) -> Result<Vec<PublicUser>, AppError>;
}
