// ============================
// crates/backend-lib/src/secret.rs
// ============================
//! Secret key provisioning.
//!
//! The secret key base encrypts the remember-me cookie. It is read from a
//! local file on startup; the first start generates it. Changing the file
//! invalidates every cookie issued before.
use rand::RngCore;
use std::{fmt, fs, io::Write, path::Path};
use thiserror::Error;
use tracing::info;
use zeroize::Zeroize;

/// Number of random bytes behind a generated secret (hex-encoded to 128 chars)
pub const SECRET_BYTES: usize = 64;

/// Errors raised while provisioning the secret file
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("failed to access secret file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Where a [`SecretToken`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretOrigin {
    /// Freshly generated and written on this call
    Generated,
    /// Read from an existing file
    Loaded,
}

/// Process-wide secret value. Zeroized on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretToken {
    value: String,
    origin: SecretOrigin,
}

impl SecretToken {
    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn origin(&self) -> SecretOrigin {
        self.origin
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretToken")
            .field("value", &"[REDACTED]")
            .field("origin", &self.origin)
            .finish()
    }
}

impl Drop for SecretToken {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

/// Return the secret stored at `path`, generating and persisting one if the file is absent.
///
/// Existing contents are returned with trailing whitespace trimmed. A generated secret is
/// 64 bytes from the OS-seeded CSPRNG, hex-encoded and written newline-terminated.
/// Two processes racing on the first start both write; the last writer wins.
pub fn get_or_create_secret<P: AsRef<Path>>(path: P) -> Result<SecretToken, SecretError> {
    let path = path.as_ref();
    let io_err = |source| SecretError::Io {
        path: path.display().to_string(),
        source,
    };

    if path.exists() {
        let mut contents = fs::read_to_string(path).map_err(io_err)?;
        let value = contents.trim_end().to_string();
        contents.zeroize();
        info!(path = %path.display(), "loaded secret key base");
        return Ok(SecretToken {
            value,
            origin: SecretOrigin::Loaded,
        });
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let value = generate_secret();
    let mut file = open_private(path).map_err(io_err)?;
    file.write_all(value.as_bytes()).map_err(io_err)?;
    file.write_all(b"\n").map_err(io_err)?;
    file.sync_all().map_err(io_err)?;

    info!(path = %path.display(), "generated new secret key base");
    Ok(SecretToken {
        value,
        origin: SecretOrigin::Generated,
    })
}

fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    let value = hex::encode(bytes);
    bytes.zeroize();
    value
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
