// ============================
// sample-app-backend/src/storage.rs
// ============================
//! Storage abstraction with in-memory and flat-file implementations.
//!
//! Both backends keep a unique index on the lower-cased email and check it
//! in the same critical section as the write, so two concurrent signups
//! with the same address cannot both land.
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use sample_app_common::UserId;
use thiserror::Error;
use tokio::{fs as tokio_fs, io::AsyncWriteExt, sync::Mutex};
use tracing::debug;

use crate::config::{StorageBackend, StorageSettings};
use crate::models::{canonicalize_email, User};

/// File holding every user record for the flat-file backend
pub const USERS_FILE: &str = "users.json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("email already taken: {0}")]
    DuplicateEmail(String),

    #[error("user not found: {0}")]
    NotFound(UserId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Trait for user storage backends
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new record. Fails with `DuplicateEmail` if the lower-cased email is indexed.
    async fn insert(&self, user: User) -> Result<User, StorageError>;

    /// Replace an existing record, moving its email index entry if the email changed
    async fn update(&self, user: User) -> Result<User, StorageError>;

    async fn get(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// Case-insensitive lookup
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    async fn find_by_remember_token(&self, token: &str) -> Result<Option<User>, StorageError>;
}

/// Build the backend selected in the settings
pub fn build_store(settings: &StorageSettings) -> Result<Arc<dyn UserStore>, StorageError> {
    Ok(match settings.backend {
        StorageBackend::Memory => Arc::new(MemoryUserStore::new()),
        StorageBackend::File => Arc::new(FlatFileUserStore::new(&settings.path)?),
    })
}

/// In-process store backed by concurrent maps
#[derive(Default, Clone)]
pub struct MemoryUserStore {
    users: Arc<DashMap<UserId, User>>,
    by_email: Arc<DashMap<String, UserId>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: User) -> Result<User, StorageError> {
        let key = canonicalize_email(&user.email);
        // The vacant entry holds its shard lock until the record is in place
        match self.by_email.entry(key) {
            Entry::Occupied(e) => Err(StorageError::DuplicateEmail(e.key().clone())),
            Entry::Vacant(slot) => {
                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                debug!(user_id = %user.id, "inserted user");
                Ok(user)
            },
        }
    }

    async fn update(&self, user: User) -> Result<User, StorageError> {
        let old_email = match self.users.get(&user.id) {
            Some(existing) => canonicalize_email(&existing.email),
            None => return Err(StorageError::NotFound(user.id)),
        };
        let new_email = canonicalize_email(&user.email);

        if new_email != old_email {
            match self.by_email.entry(new_email) {
                Entry::Occupied(e) if *e.get() != user.id => {
                    return Err(StorageError::DuplicateEmail(e.key().clone()));
                },
                Entry::Occupied(_) => {},
                Entry::Vacant(slot) => {
                    slot.insert(user.id);
                },
            }
            self.by_email.remove_if(&old_email, |_, id| *id == user.id);
        }

        self.users.insert(user.id, user.clone());
        debug!(user_id = %user.id, "updated user");
        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StorageError> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let id = match self.by_email.get(&canonicalize_email(email)) {
            Some(id) => *id,
            None => return Ok(None),
        };
        self.get(id).await
    }

    async fn find_by_remember_token(&self, token: &str) -> Result<Option<User>, StorageError> {
        if token.is_empty() {
            return Ok(None);
        }
        Ok(self
            .users
            .iter()
            .find(|u| u.remember_token == token)
            .map(|u| u.value().clone()))
    }
}

/// Flat-file implementation of the UserStore trait.
///
/// All records live in one JSON document that is rewritten through a
/// temporary file and renamed into place.
pub struct FlatFileUserStore {
    root: PathBuf,
    users: Mutex<Vec<User>>,
}

impl FlatFileUserStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let path = root.join(USERS_FILE);
        let users = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };
        debug!(path = %path.display(), count = users.len(), "opened user store");

        Ok(Self {
            root,
            users: Mutex::new(users),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(USERS_FILE)
    }

    async fn persist(&self, users: &[User]) -> Result<(), StorageError> {
        let path = self.path();
        let tmp = self.root.join(format!("{USERS_FILE}.tmp"));

        let json = serde_json::to_string_pretty(users)?;
        let mut file = create_private(&tmp).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        tokio_fs::rename(&tmp, &path).await?;
        Ok(())
    }

    fn email_taken(users: &[User], email: &str, except: Option<UserId>) -> bool {
        users
            .iter()
            .any(|u| Some(u.id) != except && canonicalize_email(&u.email) == email)
    }
}

/// Records hold password digests and remember tokens: owner-only on unix
async fn create_private(path: &Path) -> std::io::Result<tokio_fs::File> {
    let mut options = tokio_fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await
}

#[async_trait]
impl UserStore for FlatFileUserStore {
    async fn insert(&self, user: User) -> Result<User, StorageError> {
        let mut users = self.users.lock().await;
        let email = canonicalize_email(&user.email);
        if Self::email_taken(&users, &email, None) {
            return Err(StorageError::DuplicateEmail(email));
        }

        users.push(user.clone());
        if let Err(e) = self.persist(&users).await {
            users.pop();
            return Err(e);
        }
        debug!(user_id = %user.id, "inserted user");
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, StorageError> {
        let mut users = self.users.lock().await;
        let email = canonicalize_email(&user.email);
        if Self::email_taken(&users, &email, Some(user.id)) {
            return Err(StorageError::DuplicateEmail(email));
        }

        let index = users
            .iter()
            .position(|u| u.id == user.id)
            .ok_or(StorageError::NotFound(user.id))?;
        let previous = std::mem::replace(&mut users[index], user.clone());
        if let Err(e) = self.persist(&users).await {
            users[index] = previous;
            return Err(e);
        }
        debug!(user_id = %user.id, "updated user");
        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let email = canonicalize_email(email);
        let users = self.users.lock().await;
        Ok(users
            .iter()
            .find(|u| canonicalize_email(&u.email) == email)
            .cloned())
    }

    async fn find_by_remember_token(&self, token: &str) -> Result<Option<User>, StorageError> {
        if token.is_empty() {
            return Ok(None);
        }
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.remember_token == token).cloned())
    }
}
