//! Domain records.

pub mod user;

pub use user::{
    apply_changes, canonicalize_email, derive_digest, prepare_new_user, User, UserChanges,
    UserForm,
};
