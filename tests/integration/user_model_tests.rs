use std::sync::Arc;

use sample_app_backend::error::AppError;
use sample_app_backend::models::{prepare_new_user, UserChanges, UserForm};
use sample_app_backend::storage::{MemoryUserStore, UserStore};
use sample_app_backend::users::UserService;
use sample_app_backend::validation::MSG_TAKEN;
use crate::test_utils::{example_form, fast_hasher};

fn service() -> (UserService, Arc<MemoryUserStore>) {
    let store = Arc::new(MemoryUserStore::new());
    (UserService::new(store.clone(), fast_hasher()), store)
}

#[tokio::test]
async fn test_email_is_saved_lower_case() {
    let (users, store) = service();
    let mut form = example_form();
    form.email = "Foo@ExAMPle.CoM".to_string();

    let user = users.create(&form).await.unwrap();
    let reloaded = store.get(user.id).await.unwrap().unwrap();
    assert_eq!(reloaded.email, "foo@example.com");
}

#[tokio::test]
async fn test_duplicate_email_differing_in_case_is_rejected() {
    let (users, store) = service();
    users.create(&example_form()).await.unwrap();

    let mut duplicate = example_form();
    duplicate.email = duplicate.email.to_uppercase();
    let err = users.create(&duplicate).await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.validation_errors().unwrap().on("email"), vec![MSG_TAKEN]);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_invalid_user_is_not_persisted() {
    let (users, store) = service();
    let form = UserForm::new("", "user@example.com", "foobar", "foobar");

    assert!(users.create(&form).await.is_err());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_remember_token_is_set_on_create() {
    let (users, _store) = service();
    let user = users.create(&example_form()).await.unwrap();
    assert!(!user.remember_token.trim().is_empty());

    let other = users
        .create(&UserForm::new("Other", "other@example.com", "foobar", "foobar"))
        .await
        .unwrap();
    assert_ne!(user.remember_token, other.remember_token);
}

#[tokio::test]
async fn test_password_is_stored_as_digest() {
    let (users, _store) = service();
    let user = users.create(&example_form()).await.unwrap();

    assert_ne!(user.password_digest, "foobar");
    assert!(user.password_digest.starts_with("$scrypt$"));
}

#[tokio::test]
async fn test_authenticate() {
    let (users, store) = service();
    let created = users.create(&example_form()).await.unwrap();
    let found = store.find_by_email("user@example.com").await.unwrap().unwrap();
    let hasher = users.hasher();

    assert_eq!(found.authenticate(hasher, "foobar"), Some(&created));

    let wrong = found.authenticate(hasher, "invalid");
    assert!(wrong.is_none());
    assert_ne!(wrong, found.authenticate(hasher, "foobar"));
}

#[tokio::test]
async fn test_authenticate_with_empty_digest() {
    let hasher = fast_hasher();
    let mut user = prepare_new_user(&example_form(), hasher.as_ref()).unwrap();
    user.password_digest.clear();
    assert!(user.authenticate(hasher.as_ref(), "foobar").is_none());
}

#[tokio::test]
async fn test_update_keeps_password_when_omitted() {
    let (users, _store) = service();
    let user = users.create(&example_form()).await.unwrap();

    let mut changes = UserChanges::default();
    changes.name = Some("New Name".to_string());
    let updated = users.update(user.id, &changes).await.unwrap();

    assert_eq!(updated.name, "New Name");
    assert_eq!(updated.password_digest, user.password_digest);
    assert_eq!(updated.remember_token, user.remember_token);
}

#[tokio::test]
async fn test_update_cannot_take_another_users_email() {
    let (users, _store) = service();
    users.create(&example_form()).await.unwrap();
    let other = users
        .create(&UserForm::new("Other", "other@example.com", "foobar", "foobar"))
        .await
        .unwrap();

    let mut changes = UserChanges::default();
    changes.email = Some("User@Example.com".to_string());
    let err = users.update(other.id, &changes).await.unwrap_err();
    assert_eq!(err.validation_errors().unwrap().on("email"), vec![MSG_TAKEN]);
}
