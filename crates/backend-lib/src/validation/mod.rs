// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Validation gates run before register and login touch any state.
//!
//! A chain runs its gates left to right and stops at the first failure.
//! Gate failures are expected, user-facing outcomes; storage faults hit
//! while evaluating a gate are passed through unchanged so they reach the
//! 5xx path instead of being reported as a rejection.

use axum::http::StatusCode;
use metrics::counter;
use sessiongate_common::Credentials;
use thiserror::Error;
use tracing::debug;

use crate::auth::{PasswordPolicy, SessionContext};
use crate::error::AppError;
use crate::metrics as keys;
use crate::storage::{User, UserFilter, UserStore};

/// Possible gate rejections
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateFailure {
    #[error("username is required")]
    UsernameRequired,

    #[error("username already in use")]
    UsernameTaken,

    #[error("invalid credentials")]
    InvalidCredentials,

    /// Carries the policy's client-facing message
    #[error("{0}")]
    PasswordTooShort(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl GateFailure {
    /// Get the HTTP status code for this rejection
    pub fn status_code(&self) -> StatusCode {
        match self {
            GateFailure::UsernameRequired
            | GateFailure::UsernameTaken
            | GateFailure::PasswordTooShort(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GateFailure::InvalidCredentials | GateFailure::Unauthorized => {
                StatusCode::UNAUTHORIZED
            },
        }
    }

    /// Message sent to the client
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// A single precondition check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Username is present and not blank
    UsernamePresent,
    /// No stored user has this username
    UsernameFree,
    /// Some stored user has this username
    UsernameExists,
    /// Password is present and long enough
    PasswordPolicy,
}

impl Gate {
    pub fn name(&self) -> &'static str {
        match self {
            Gate::UsernamePresent => "username_present",
            Gate::UsernameFree => "username_free",
            Gate::UsernameExists => "username_exists",
            Gate::PasswordPolicy => "password_policy",
        }
    }

    /// Evaluate this gate against the submitted credentials
    pub async fn check(
        &self,
        input: &Credentials,
        store: &dyn UserStore,
        policy: &PasswordPolicy,
    ) -> Result<(), AppError> {
        match self {
            Gate::UsernamePresent => {
                if input.username().trim().is_empty() {
                    return Err(GateFailure::UsernameRequired.into());
                }
            },
            Gate::UsernameFree => {
                if !username_matches(input, store).await?.is_empty() {
                    return Err(GateFailure::UsernameTaken.into());
                }
            },
            Gate::UsernameExists => {
                if username_matches(input, store).await?.is_empty() {
                    return Err(GateFailure::InvalidCredentials.into());
                }
            },
            Gate::PasswordPolicy => {
                if !policy.accepts(input.password.as_deref()) {
                    return Err(GateFailure::PasswordTooShort(policy.failure_message()).into());
                }
            },
        }
        Ok(())
    }
}

async fn username_matches(
    input: &Credentials,
    store: &dyn UserStore,
) -> Result<Vec<User>, AppError> {
    Ok(store
        .find_by(&UserFilter::Username(input.username().to_string()))
        .await?)
}

const REGISTER_GATES: &[Gate] = &[Gate::UsernamePresent, Gate::UsernameFree, Gate::PasswordPolicy];
const LOGIN_GATES: &[Gate] = &[Gate::UsernameExists, Gate::PasswordPolicy];

/// Ordered list of gates guarding one operation
#[derive(Debug, Clone)]
pub struct GateChain {
    gates: &'static [Gate],
    /// Rejection reported in place of whatever gate failed
    mask: Option<GateFailure>,
}

impl GateChain {
    /// Gates in front of register
    pub fn register() -> Self {
        Self {
            gates: REGISTER_GATES,
            mask: None,
        }
    }

    /// Gates in front of login.
    ///
    /// Every rejection is reported as `InvalidCredentials` so a client cannot
    /// tell an unknown username from a bad password.
    pub fn login() -> Self {
        Self {
            gates: LOGIN_GATES,
            mask: Some(GateFailure::InvalidCredentials),
        }
    }

    pub fn gates(&self) -> &[Gate] {
        self.gates
    }

    /// Run every gate in order, stopping at the first failure
    pub async fn run(
        &self,
        input: &Credentials,
        store: &dyn UserStore,
        policy: &PasswordPolicy,
    ) -> Result<(), AppError> {
        for gate in self.gates {
            match gate.check(input, store, policy).await {
                Ok(()) => {},
                Err(AppError::Gate(failure)) => {
                    counter!(keys::GATE_REJECTED, "gate" => gate.name()).increment(1);
                    debug!(gate = gate.name(), reason = %failure, "gate rejected request");
                    let reported = self.mask.clone().unwrap_or(failure);
                    return Err(AppError::Gate(reported));
                },
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }
}

/// Session-Required gate: the principal of an authenticated session
pub fn require_session(session: &SessionContext) -> Result<User, GateFailure> {
    session.current().ok_or_else(|| {
        counter!(keys::GATE_REJECTED, "gate" => "session_required").increment(1);
        GateFailure::Unauthorized
    })
}
