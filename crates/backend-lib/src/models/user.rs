//! User record and the write pipeline that turns a validated form into one.
//!
//! Order on create: [`canonicalize_email`] → [`derive_digest`] →
//! [`generate_remember_token`]. Updates re-run the first two for the
//! fields that changed.

use chrono::{DateTime, Utc};
use sample_app_common::{SignupRequest, UpdateUserRequest, UserId, UserView};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::auth::{generate_remember_token, CredentialHasher};

/// Persisted user. Holds no plaintext password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Always lower-case
    pub email: String,
    /// PHC string produced by a [`CredentialHasher`]
    pub password_digest: String,
    /// Never blank once the record exists
    pub remember_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Return `self` when `candidate` matches the stored digest.
    ///
    /// An empty digest never matches. Wrong passwords are not errors.
    pub fn authenticate(&self, hasher: &dyn CredentialHasher, candidate: &str) -> Option<&User> {
        if self.password_digest.is_empty() {
            return None;
        }
        hasher
            .verify(candidate, &self.password_digest)
            .then_some(self)
    }

    pub fn view(&self) -> UserView {
        UserView::from(self)
    }
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

/// Attributes submitted for a new user, or a merged view of an update.
/// Plaintext passwords are wiped when the form is dropped.
#[derive(Clone, Default)]
pub struct UserForm {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

impl UserForm {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        password_confirmation: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: Some(password.into()),
            password_confirmation: Some(password_confirmation.into()),
        }
    }

    pub fn set_password(&mut self, password: impl Into<String>, confirmation: impl Into<String>) {
        self.clear_password();
        self.password = Some(password.into());
        self.password_confirmation = Some(confirmation.into());
    }

    fn clear_password(&mut self) {
        if let Some(p) = self.password.as_mut() {
            p.zeroize();
        }
        if let Some(p) = self.password_confirmation.as_mut() {
            p.zeroize();
        }
    }
}

impl std::fmt::Debug for UserForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Drop for UserForm {
    fn drop(&mut self) {
        self.clear_password();
    }
}

impl From<SignupRequest> for UserForm {
    fn from(req: SignupRequest) -> Self {
        let SignupRequest {
            name,
            email,
            password,
            password_confirmation,
        } = req;
        Self::new(name, email, password, password_confirmation)
    }
}

/// Partial update of an existing user. `None` leaves a field unchanged.
#[derive(Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

impl UserChanges {
    /// Overlay the changes on the current record, producing the form to validate
    pub fn merge_onto(&self, user: &User) -> UserForm {
        UserForm {
            name: self.name.clone().unwrap_or_else(|| user.name.clone()),
            email: self.email.clone().unwrap_or_else(|| user.email.clone()),
            password: self.password.clone(),
            password_confirmation: self.password_confirmation.clone(),
        }
    }
}

impl Drop for UserChanges {
    fn drop(&mut self) {
        if let Some(p) = self.password.as_mut() {
            p.zeroize();
        }
        if let Some(p) = self.password_confirmation.as_mut() {
            p.zeroize();
        }
    }
}

impl From<UpdateUserRequest> for UserChanges {
    fn from(req: UpdateUserRequest) -> Self {
        let UpdateUserRequest {
            name,
            email,
            password,
            password_confirmation,
        } = req;
        Self {
            name,
            email,
            password,
            password_confirmation,
        }
    }
}

/// Lower-case an address so lookups and the unique index agree.
pub fn canonicalize_email(email: &str) -> String {
    email.to_lowercase()
}

/// Hash a plaintext password. Pre: the password passed validation.
pub fn derive_digest(hasher: &dyn CredentialHasher, password: &str) -> anyhow::Result<String> {
    hasher.hash(password)
}

/// Build the record to insert from a validated form.
/// Post: email canonical, digest set, remember token non-blank.
pub fn prepare_new_user(form: &UserForm, hasher: &dyn CredentialHasher) -> anyhow::Result<User> {
    let password = form
        .password
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("password is required to create a user"))?;
    let now = Utc::now();

    let email = canonicalize_email(&form.email);
    let password_digest = derive_digest(hasher, password)?;
    let remember_token = generate_remember_token();

    Ok(User {
        id: Uuid::new_v4(),
        name: form.name.clone(),
        email,
        password_digest,
        remember_token,
        created_at: now,
        updated_at: now,
    })
}

/// Apply a validated form to an existing record
pub fn apply_changes(
    user: &User,
    form: &UserForm,
    hasher: &dyn CredentialHasher,
) -> anyhow::Result<User> {
    let mut updated = user.clone();
    updated.name = form.name.clone();
    updated.email = canonicalize_email(&form.email);
    if let Some(password) = form.password.as_deref() {
        updated.password_digest = derive_digest(hasher, password)?;
    }
    updated.updated_at = Utc::now();
    Ok(updated)
}
