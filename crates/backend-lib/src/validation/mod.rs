// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! User record validation.
//!
//! Every rule runs independently; a record with several problems reports
//! all of them. Uniqueness needs the store and lives in
//! [`UserService::validate`](crate::users::UserService::validate).

use crate::auth::MIN_PASSWORD_LENGTH;
use crate::models::UserForm;
use regex::Regex;
use sample_app_common::FieldError;
use std::fmt;
use std::sync::LazyLock;

pub const MAX_NAME_LENGTH: usize = 50;
pub const MAX_EMAIL_LENGTH: usize = 50;

pub const MSG_BLANK: &str = "can't be blank";
pub const MSG_INVALID: &str = "is invalid";
pub const MSG_TAKEN: &str = "has already been taken";
pub const MSG_CONFIRMATION: &str = "doesn't match Password";

// Local part: alphanumerics and `_ + . -`. Domain: alphanumeric/hyphen labels
// joined by single dots, ending in a label of at least two letters.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_+.\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

/// Whether validation runs for a new record or for changes to an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Password is mandatory
    Create,
    /// Password rules apply only when a new password is supplied
    Update,
}

/// Field errors collected for one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Messages recorded against `field`
    pub fn on(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }

    pub fn full_messages(&self) -> Vec<String> {
        self.errors.iter().map(FieldError::full_message).collect()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_messages().join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn too_long(max: usize) -> String {
    format!("is too long (maximum is {max} characters)")
}

/// Validate a display name
pub fn validate_name(name: &str, errors: &mut ValidationErrors) {
    if is_blank(name) {
        errors.add("name", MSG_BLANK);
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        errors.add("name", too_long(MAX_NAME_LENGTH));
    }
}

/// Check an address against the accepted email grammar
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Validate an email address
pub fn validate_email(email: &str, errors: &mut ValidationErrors) {
    if is_blank(email) {
        errors.add("email", MSG_BLANK);
    }
    if email.chars().count() > MAX_EMAIL_LENGTH {
        errors.add("email", too_long(MAX_EMAIL_LENGTH));
    }
    if !is_valid_email(email) {
        errors.add("email", MSG_INVALID);
    }
}

/// Validate a new password and its confirmation
pub fn validate_password(
    password: &str,
    confirmation: Option<&str>,
    errors: &mut ValidationErrors,
) {
    if is_blank(password) {
        errors.add("password", MSG_BLANK);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            "password",
            format!("is too short (minimum is {MIN_PASSWORD_LENGTH} characters)"),
        );
    }
    if confirmation != Some(password) {
        errors.add("password_confirmation", MSG_CONFIRMATION);
    }
}

/// Run every record-level rule against a form
pub fn validate_user(form: &UserForm, mode: ValidationMode) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    validate_name(&form.name, &mut errors);
    validate_email(&form.email, &mut errors);

    match (&form.password, mode) {
        (Some(password), _) => {
            validate_password(password, form.password_confirmation.as_deref(), &mut errors)
        },
        (None, ValidationMode::Create) => errors.add("password", MSG_BLANK),
        (None, ValidationMode::Update) => {},
    }

    errors
}
