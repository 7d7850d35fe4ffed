// ============================
// sample-app-backend/src/auth/session.rs
// ============================
//! Remember-me cookie handling.
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use std::time::Duration;
use tracing::debug;
use zeroize::Zeroize;

use crate::config::AppConfig;
use crate::error::AppError;

/// Name of the cookie carrying the sealed remember token
pub const REMEMBER_COOKIE: &str = "remember_token";

/// Lifetime of a "permanent" cookie
pub const REMEMBER_COOKIE_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 20); // 20 years

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Seals remember tokens into opaque cookie values and opens them again.
///
/// The AES-256-GCM key is the first 32 bytes of the hex-decoded secret key
/// base, so rotating the secret file invalidates every outstanding cookie.
#[derive(Clone)]
pub struct SessionManager {
    cipher: Aes256Gcm,
}

impl SessionManager {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let mut key = hex::decode(config.secret_key_base.expose())
            .map_err(|_| AppError::Internal("secret key base is not hex".to_string()))?;
        if key.len() < KEY_LEN {
            key.zeroize();
            return Err(AppError::Internal("secret key base is too short".to_string()));
        }
        let cipher = Aes256Gcm::new_from_slice(&key[..KEY_LEN])
            .map_err(|_| AppError::Internal("invalid cookie key length".to_string()));
        key.zeroize();
        Ok(Self { cipher: cipher? })
    }

    /// Encrypt a remember token into a cookie value: base64(nonce || ciphertext)
    pub fn seal(&self, remember_token: &str) -> Result<String, AppError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let encrypted = self
            .cipher
            .encrypt(nonce, remember_token.as_bytes())
            .map_err(|_| AppError::Internal("failed to seal session cookie".to_string()))?;

        let mut combined = Vec::with_capacity(NONCE_LEN + encrypted.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&encrypted);
        Ok(URL_SAFE_NO_PAD.encode(combined))
    }

    /// Decrypt a cookie value. Tampered, truncated or foreign cookies yield `None`.
    pub fn open(&self, cookie_value: &str) -> Option<String> {
        let combined = URL_SAFE_NO_PAD.decode(cookie_value).ok()?;
        if combined.len() <= NONCE_LEN {
            return None;
        }
        let (nonce_bytes, encrypted) = combined.split_at(NONCE_LEN);

        match self.cipher.decrypt(Nonce::from_slice(nonce_bytes), encrypted) {
            Ok(plain) => String::from_utf8(plain).ok(),
            Err(_) => {
                debug!("rejected session cookie that failed to decrypt");
                None
            },
        }
    }

    /// Remember token carried by the request's cookie jar, if it opens
    pub fn open_jar(&self, jar: &CookieJar) -> Option<String> {
        let cookie = jar.get(REMEMBER_COOKIE)?;
        // RFC 6265 allows the value to be wrapped in double quotes
        let value = cookie.value_trimmed();
        if value.is_empty() {
            return None;
        }
        self.open(value)
    }

    /// Permanent cookie carrying the sealed token
    pub fn remember_cookie(&self, remember_token: &str) -> Result<Cookie<'static>, AppError> {
        let value = self.seal(remember_token)?;
        let max_age = cookie::time::Duration::seconds(REMEMBER_COOKIE_TTL.as_secs() as i64);
        Ok(base_cookie(value).max_age(max_age).build())
    }

    /// Cookie that tells the browser to drop the remember cookie
    pub fn expired_cookie() -> Cookie<'static> {
        base_cookie(String::new())
            .max_age(cookie::time::Duration::ZERO)
            .build()
    }
}

fn base_cookie(value: String) -> cookie::CookieBuilder<'static> {
    Cookie::build((REMEMBER_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
}
