// ============================
// sample-app-backend/src/users.rs
// ============================
//! User service: validation, creation, updates and authentication.
use std::sync::Arc;

use metrics::counter;
use sample_app_common::UserId;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::auth::{generate_remember_token, CredentialHasher};
use crate::error::AppError;
use crate::metrics as keys;
use crate::models::{apply_changes, prepare_new_user, User, UserChanges, UserForm};
use crate::storage::UserStore;
use crate::validation::{validate_user, ValidationMode, MSG_TAKEN};

/// Entry point for everything that reads or writes users
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { store, hasher }
    }

    pub fn hasher(&self) -> &dyn CredentialHasher {
        self.hasher.as_ref()
    }

    /// Run password work on the blocking pool; scrypt and argon2 hold a core for the whole hash
    async fn with_hasher<T, F>(&self, work: F) -> Result<T, AppError>
    where
        F: FnOnce(&dyn CredentialHasher) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || work(hasher.as_ref()))
            .await
            .map_err(|e| AppError::Internal(format!("password task failed: {e}")))?
            .map_err(AppError::from)
    }

    /// Run every rule, including case-insensitive email uniqueness.
    ///
    /// `existing` is the record being updated, if any; its own email does not count as taken.
    pub async fn validate(
        &self,
        form: &UserForm,
        existing: Option<&User>,
    ) -> Result<(), AppError> {
        let mode = match existing {
            Some(_) => ValidationMode::Update,
            None => ValidationMode::Create,
        };
        let mut errors = validate_user(form, mode);

        if errors.on("email").is_empty() {
            let taken = match self.store.find_by_email(&form.email).await? {
                Some(other) => existing.map_or(true, |me| me.id != other.id),
                None => false,
            };
            if taken {
                errors.add("email", MSG_TAKEN);
            }
        }

        errors.into_result().map_err(AppError::Validation)
    }

    /// Validate and persist a new user
    pub async fn create(&self, form: &UserForm) -> Result<User, AppError> {
        self.validate(form, None).await?;

        let form = form.clone();
        let user = self
            .with_hasher(move |hasher| prepare_new_user(&form, hasher))
            .await?;
        // The store's unique index settles races the lookup above cannot see
        let user = self.store.insert(user).await?;

        counter!(keys::USER_CREATED).increment(1);
        info!(user_id = %user.id, "created user");
        Ok(user)
    }

    /// Apply a partial update to an existing user
    pub async fn update(&self, id: UserId, changes: &UserChanges) -> Result<User, AppError> {
        let current = self.find(id).await?;
        let form = changes.merge_onto(&current);
        self.validate(&form, Some(&current)).await?;

        let updated = self
            .with_hasher(move |hasher| apply_changes(&current, &form, hasher))
            .await?;
        let updated = self.store.update(updated).await?;
        info!(user_id = %updated.id, "updated user");
        Ok(updated)
    }

    /// Fetch a user by id; missing users are `NotFound`
    pub async fn find(&self, id: UserId) -> Result<User, AppError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {id}")))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.store.find_by_email(email).await?)
    }

    pub async fn find_by_remember_token(&self, token: &str) -> Result<Option<User>, AppError> {
        Ok(self.store.find_by_remember_token(token).await?)
    }

    /// Look up by email and check the password.
    ///
    /// Unknown emails and wrong passwords both return `Ok(None)`.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, AppError> {
        let user = match self.store.find_by_email(email).await? {
            Some(user) => user,
            None => {
                counter!(keys::SIGNIN_FAILED).increment(1);
                warn!("sign-in failed: unknown email");
                return Ok(None);
            },
        };

        let user_id = user.id;
        let password = Zeroizing::new(password.to_owned());
        let verified = self
            .with_hasher(move |hasher| {
                let matched = user.authenticate(hasher, &password).is_some();
                Ok(matched.then_some(user))
            })
            .await?;

        if verified.is_some() {
            counter!(keys::SIGNIN_SUCCEEDED).increment(1);
        } else {
            counter!(keys::SIGNIN_FAILED).increment(1);
            warn!(user_id = %user_id, "sign-in failed: wrong password");
        }
        Ok(verified)
    }

    /// Replace the remember token so previously issued cookies stop resolving
    pub async fn rotate_remember_token(&self, id: UserId) -> Result<User, AppError> {
        let mut user = self.find(id).await?;
        user.remember_token = generate_remember_token();
        user.updated_at = chrono::Utc::now();
        Ok(self.store.update(user).await?)
    }
}
