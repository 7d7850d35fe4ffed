// ============================
// sample-app-backend/src/auth/password.rs
// ============================
//! Password hashing and verification.
use std::sync::Arc;

use anyhow::anyhow;
use argon2::{Algorithm, Argon2, Version};
use rand::RngCore;
use scrypt::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Scrypt,
};

use crate::config::{HasherKind, PasswordSettings};

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// One-way salted password hashing.
///
/// Digests are PHC strings (`$scrypt$...`, `$argon2id$...`), so the
/// parameters travel with the digest and can change without a migration.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext password with a fresh random salt
    fn hash(&self, plain: &str) -> anyhow::Result<String>;

    /// Check `plain` against `digest`. Malformed or empty digests never match.
    fn verify(&self, plain: &str, digest: &str) -> bool;
}

fn random_salt() -> anyhow::Result<SaltString> {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    SaltString::encode_b64(&bytes).map_err(|e| anyhow!("failed to encode salt: {e}"))
}

/// scrypt hasher
#[derive(Debug, Clone)]
pub struct ScryptHasher {
    params: scrypt::Params,
}

impl ScryptHasher {
    pub fn new(log_n: u8, r: u32, p: u32) -> anyhow::Result<Self> {
        let params = scrypt::Params::new(log_n, r, p, scrypt::Params::RECOMMENDED_LEN)
            .map_err(|e| anyhow!("invalid scrypt parameters: {e}"))?;
        Ok(Self { params })
    }
}

impl CredentialHasher for ScryptHasher {
    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = random_salt()?;
        let hash = Scrypt
            .hash_password_customized(plain.as_bytes(), None, None, self.params, &salt)
            .map_err(|e| anyhow!("scrypt hashing failed: {e}"))?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, plain: &str, digest: &str) -> bool {
        let parsed_hash = match PasswordHash::new(digest) {
            Ok(h) => h,
            Err(_) => return false,
        };
        Scrypt.verify_password(plain.as_bytes(), &parsed_hash).is_ok()
    }
}

/// argon2id hasher
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: argon2::Params,
}

impl Argon2Hasher {
    pub fn new(m_cost: u32, t_cost: u32, p_cost: u32) -> anyhow::Result<Self> {
        let params = argon2::Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| anyhow!("invalid argon2 parameters: {e}"))?;
        Ok(Self { params })
    }

    fn engine(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = random_salt()?;
        let hash = self
            .engine()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| anyhow!("argon2 hashing failed: {e}"))?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, plain: &str, digest: &str) -> bool {
        let parsed_hash = match PasswordHash::new(digest) {
            Ok(h) => h,
            Err(_) => return false,
        };
        self.engine().verify_password(plain.as_bytes(), &parsed_hash).is_ok()
    }
}

/// Build the hasher selected in the settings
pub fn build_hasher(settings: &PasswordSettings) -> anyhow::Result<Arc<dyn CredentialHasher>> {
    Ok(match settings.hasher {
        HasherKind::Scrypt => Arc::new(ScryptHasher::new(
            settings.scrypt_log_n,
            settings.scrypt_r,
            settings.scrypt_p,
        )?),
        HasherKind::Argon2 => Arc::new(Argon2Hasher::new(
            settings.argon2_m_cost,
            settings.argon2_t_cost,
            settings.argon2_p_cost,
        )?),
    })
}
