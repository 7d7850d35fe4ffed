// ============================
// sample-app-backend/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod password;
pub mod session;
pub mod token_generator;

pub use password::{build_hasher, Argon2Hasher, CredentialHasher, ScryptHasher, MIN_PASSWORD_LENGTH};
pub use session::{SessionManager, REMEMBER_COOKIE, REMEMBER_COOKIE_TTL};
pub use token_generator::generate_remember_token;
