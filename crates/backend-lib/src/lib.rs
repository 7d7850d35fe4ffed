// ============================
// sample-app-backend/src/lib.rs
// ============================
//! Core functionality of the sample-app account service: secret provisioning,
//! the user credential model, storage and the HTTP router.

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod secret;
pub mod storage;
pub mod users;
pub mod validation;

use std::sync::Arc;
use crate::auth::{build_hasher, SessionManager};
use crate::config::{AppConfig, Settings};
use crate::error::AppError;
use crate::storage::{build_store, UserStore};
use crate::users::UserService;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// User service
    pub users: UserService,
    /// Remember-cookie sealing
    pub sessions: SessionManager,
    /// Settings the process started with
    pub settings: Arc<Settings>,
    /// Provisioned runtime configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Create application state over an explicit store
    pub fn new(
        store: Arc<dyn UserStore>,
        settings: Settings,
        config: AppConfig,
    ) -> Result<Self, AppError> {
        let hasher = build_hasher(&settings.password)?;
        let sessions = SessionManager::new(&config)?;

        Ok(Self {
            users: UserService::new(store, hasher),
            sessions,
            settings: Arc::new(settings),
            config: Arc::new(config),
        })
    }

    /// Create application state from settings: provision the secret and open the configured store
    pub fn from_settings(settings: Settings) -> Result<Self, AppError> {
        let config = AppConfig::provision(&settings)?;
        let store = build_store(&settings.storage)?;
        Self::new(store, settings, config)
    }
}
