// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
/** Session identifier generation
Session ids are the only secret a client holds after login, so they are
drawn from the thread-local CSPRNG rather than derived from anything
about the user. */
use rand::RngCore;

/// Default id size in bytes (32 bytes = 256 bits of entropy)
const DEFAULT_TOKEN_BYTES: usize = 32;

/** Generate a random session id
# Returns
A base64 URL-safe encoded string without padding, safe to place in a cookie */
pub fn generate_session_id() -> String {
    generate_token_with_size(DEFAULT_TOKEN_BYTES)
}

/** Generate a random token with specified size
# Arguments
* `bytes` - The size of the random token in bytes */
pub fn generate_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}
