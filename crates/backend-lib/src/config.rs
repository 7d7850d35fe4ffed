// ============================
// sample-app-backend/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use figment::{Figment, providers::{Env, Format, Serialized, Toml}};
use thiserror::Error;
use crate::secret::{get_or_create_secret, SecretError, SecretToken};

/// Prefix of environment variables overriding file settings, e.g. `SAMPLE_APP_SERVER__PORT`
pub const ENV_PREFIX: &str = "SAMPLE_APP_";

/// Default location of the settings file
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Minimum accepted secret length in hex characters (32 bytes of key material)
pub const MIN_SECRET_HEX_LEN: usize = 64;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] figment::Error),

    #[error("invalid setting: {0}")]
    Invalid(String),

    #[error(transparent)]
    Secret(#[from] SecretError),
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub secret: SecretSettings,
    pub password: PasswordSettings,
    /// Default tracing filter when `RUST_LOG` is not set
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Which [`UserStore`](crate::storage::UserStore) backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Data directory used by the file backend
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretSettings {
    /// Secret key base file, relative to the working directory
    pub path: PathBuf,
}

/// Password hashing algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HasherKind {
    Scrypt,
    Argon2,
}

/// Cost parameters of the password hasher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordSettings {
    pub hasher: HasherKind,
    pub scrypt_log_n: u8,
    pub scrypt_r: u32,
    pub scrypt_p: u32,
    /// Memory cost in KiB
    pub argon2_m_cost: u32,
    pub argon2_t_cost: u32,
    pub argon2_p_cost: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            storage: StorageSettings::default(),
            secret: SecretSettings::default(),
            password: PasswordSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: PathBuf::from("data"),
        }
    }
}

impl Default for SecretSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".secret"),
        }
    }
}

impl Default for PasswordSettings {
    fn default() -> Self {
        // scrypt's recommended interactive parameters; argon2 follows OWASP's 19 MiB profile
        Self {
            hasher: HasherKind::Scrypt,
            scrypt_log_n: 15,
            scrypt_r: 8,
            scrypt_p: 1,
            argon2_m_cost: 19 * 1024,
            argon2_t_cost: 2,
            argon2_p_cost: 1,
        }
    }
}

impl Settings {
    /// Load settings from the default file and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load settings from `path` (a missing file is skipped), then apply `SAMPLE_APP_*` overrides
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check values serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "log_level must be one of {LOG_LEVELS:?}, got {:?}",
                self.log_level
            )));
        }

        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must not be 0".to_string()));
        }

        let pw = &self.password;
        if !(10..=20).contains(&pw.scrypt_log_n) || pw.scrypt_r == 0 || pw.scrypt_p == 0 {
            return Err(ConfigError::Invalid(
                "scrypt parameters out of range (log_n 10..=20, r and p > 0)".to_string(),
            ));
        }
        let min_m_cost = pw.argon2_p_cost.checked_mul(8);
        if min_m_cost.map_or(true, |min| pw.argon2_m_cost < min)
            || pw.argon2_t_cost == 0
            || pw.argon2_p_cost == 0
        {
            return Err(ConfigError::Invalid(
                "argon2 parameters out of range (m_cost >= 8 * p_cost, t_cost and p_cost > 0)"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Socket address the server binds to
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("server address: {e}")))
    }
}

/// Runtime configuration built once at startup and handed to the application state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub secret_key_base: SecretToken,
}

impl AppConfig {
    /// Provision the secret key base from the configured file
    pub fn provision(settings: &Settings) -> Result<Self, ConfigError> {
        let secret = get_or_create_secret(&settings.secret.path)?;
        Self::new(secret)
    }

    pub fn new(secret_key_base: SecretToken) -> Result<Self, ConfigError> {
        let secret = secret_key_base.expose();
        if secret.len() < MIN_SECRET_HEX_LEN || hex::decode(secret).is_err() {
            return Err(ConfigError::Invalid(format!(
                "secret key base must be at least {MIN_SECRET_HEX_LEN} hex characters"
            )));
        }
        Ok(Self { secret_key_base })
    }
}
