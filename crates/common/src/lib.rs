// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between `sessiongate` clients and the server.
//! This module defines the JSON request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};

/// Numeric user identifier assigned by storage on creation
pub type UserId = i64;

/// Body of `POST /register` and `POST /login`
///
/// Both fields are optional on the wire so that a missing password is
/// rejected by the password policy rather than by the JSON parser.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Account name
    #[serde(default)]
    pub username: Option<String>,
    /// Plaintext password, only ever held for the duration of one request
    #[serde(default)]
    pub password: Option<String>,
}

impl Credentials {
    /// Build credentials from two string slices
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }

    /// Username, or an empty string when absent
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }

    /// Password, or an empty string when absent
    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }
}

/// Public projection of a user record. Never carries the password hash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PublicUser {
    /// Storage-assigned identifier
    pub id: UserId,
    /// Unique account name
    pub username: String,
}

/// Single-message JSON body used by every non-listing response
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
