// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between sample-app clients and the server.
//! This module defines the JSON request and response bodies of the account API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned to a user when the record is created
pub type UserId = Uuid;

/// Body of a signup request
/// # Fields
/// * `name` - Display name (1-50 chars)
/// * `email` - Email address, stored lower-cased
/// * `password` - Plaintext password (min 6 chars), never persisted
/// * `password_confirmation` - Must equal `password`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Body of a sign-in request
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// Body of a profile update. Absent fields are left unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_confirmation: Option<String>,
}

/// Public representation of a user.
/// Credential material (digest, remember token) is never part of it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A single validation failure attached to a field
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Name of the offending attribute (e.g. "email")
    pub field: String,
    /// Human readable message (e.g. "is too long (maximum is 50 characters)")
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Message prefixed with the capitalised field name, e.g. "Email is invalid"
    pub fn full_message(&self) -> String {
        let mut chars = self.field.chars();
        let field = match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        };
        format!("{} {}", field.replace('_', " "), self.message)
    }
}

/// Error payload returned by the server
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Details of an error response
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    /// Stable machine readable code (e.g. "VAL_001")
    pub code: String,
    pub message: String,
    /// Present for validation failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}
