// ============================
// sessiongate-backend/src/auth/password.rs
// ============================
//! Password hashing and verification.
use scrypt::{
    password_hash::{
        self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Params, Scrypt,
};
use thiserror::Error;

/// Default work factor (scrypt log2 N)
pub const DEFAULT_HASH_COST: u8 = 12;

/// Highest work factor accepted from configuration
pub const MAX_HASH_COST: u8 = 20;

const BLOCK_SIZE: u32 = 8;
const PARALLELISM: u32 = 1;

/// Failures of the credential hasher.
///
/// A wrong password is never one of these: `verify_password` reports it as
/// `Ok(false)`.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Malformed credential hash: {0}")]
    MalformedHash(password_hash::Error),

    #[error("Invalid work factor: {0}")]
    InvalidCost(u8),

    #[error("Hashing failed: {0}")]
    Hashing(password_hash::Error),
}

fn params_for(cost: u8) -> Result<Params, CredentialError> {
    if cost == 0 || cost > MAX_HASH_COST {
        return Err(CredentialError::InvalidCost(cost));
    }
    Params::new(cost, BLOCK_SIZE, PARALLELISM, Params::RECOMMENDED_LEN)
        .map_err(|_| CredentialError::InvalidCost(cost))
}

/// Hash a password using scrypt with `cost` as log2 of the CPU/memory parameter.
///
/// The result is a PHC string carrying its own salt and parameters, so
/// verification does not need to know the cost it was produced with.
pub fn hash_password(plain: &str, cost: u8) -> Result<String, CredentialError> {
    let params = params_for(cost)?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Scrypt
        .hash_password_customized(plain.as_bytes(), None, None, params, &salt)
        .map_err(CredentialError::Hashing)?
        .to_string();
    Ok(hash)
}

/// Verify a password against a stored hash.
///
/// Output comparison inside `password_hash` is constant time.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, CredentialError> {
    let parsed_hash = PasswordHash::new(hash).map_err(CredentialError::MalformedHash)?;
    match Scrypt.verify_password(plain.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(other) => Err(CredentialError::MalformedHash(other)),
    }
}

/// Length policy applied to submitted passwords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Minimum accepted length in characters
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { min_length: 4 }
    }
}

impl PasswordPolicy {
    /// Check if a password meets the policy. A missing password never does.
    pub fn accepts(&self, password: Option<&str>) -> bool {
        password.is_some_and(|p| p.chars().count() >= self.min_length)
    }

    /// Message returned to clients whose password is rejected
    pub fn failure_message(&self) -> String {
        format!(
            "password must exceed {} characters",
            self.min_length.saturating_sub(1)
        )
    }
}
