// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
//! Secure token generation for remember-me sessions.
//!
//! Remember tokens identify a returning browser without the password. They
//! are drawn from the thread-local CSPRNG, which is seeded from the OS.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

/// Remember token size in bytes (16 bytes = 128 bits of entropy)
pub const REMEMBER_TOKEN_BYTES: usize = 16;

/** Generate a new remember token
# Returns
A base64 URL-safe encoded string without padding, never empty */
pub fn generate_remember_token() -> String {
    generate_secure_token_with_size(REMEMBER_TOKEN_BYTES)
}

/** Generate a cryptographically secure random token with specified size
# Arguments
* `bytes` - The size of the random token in bytes
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_secure_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}
