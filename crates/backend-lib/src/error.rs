// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sessiongate_common::MessageBody;
use thiserror::Error;
use tracing::error;

use crate::auth::{CredentialError, SessionError};
use crate::storage::StorageError;
use crate::validation::GateFailure;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    /// A gate rejected the request; expected and user-facing
    #[error(transparent)]
    Gate(#[from] GateFailure),

    /// The request body could not be read as JSON
    #[error("Bad request body: {0}")]
    Body(#[from] JsonRejection),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Gate(failure) => failure.status_code(),
            AppError::Body(rejection) => rejection.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Gate(GateFailure::UsernameRequired) => "VAL_001",
            AppError::Gate(GateFailure::UsernameTaken) => "VAL_002",
            AppError::Gate(GateFailure::PasswordTooShort(_)) => "VAL_003",
            AppError::Gate(GateFailure::InvalidCredentials) => "AUTH_001",
            AppError::Gate(GateFailure::Unauthorized) => "AUTH_002",
            AppError::Body(_) => "REQ_001",
            AppError::Storage(StorageError::Timeout(_)) => "STORE_002",
            AppError::Storage(_) => "STORE_001",
            AppError::Credential(_) => "CRED_001",
            AppError::Session(SessionError::Store(_)) => "SESS_001",
            AppError::Session(SessionError::Teardown(_)) => "SESS_002",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a message that is safe to show to clients.
    ///
    /// Gate failures are meant for the client; everything else is reduced
    /// to a generic string.
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Gate(failure) => failure.message(),
            AppError::Body(rejection) => rejection.body_text(),
            AppError::Session(SessionError::Teardown(_)) => {
                "failed to end the session".to_string()
            },
            _ => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(code = self.error_code(), error = %self, "request failed");
        }

        (status, Json(MessageBody::new(self.sanitized_message()))).into_response()
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Blocking task failed: {err}"))
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}
