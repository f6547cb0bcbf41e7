//! Form state, client-side validation and the payloads handed to the API.

mod account;
mod provider;
mod review;

pub use account::{
    LoginForm, LoginRequest, PasswordChange, PasswordForm, ProfileForm, ProfileSubmission,
    SignupForm, SignupSubmission,
};
pub use provider::{ProviderForm, ProviderSubmission, SubmitMode, MAX_PHOTOS};
pub use review::{ReviewForm, ReviewSubmission};

use std::fmt;

/// A validation failure attached to one form field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FormError {
    pub field: &'static str,
    pub message: String,
}

impl FormError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Every failing field of a form, in field order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormErrors(pub Vec<FormError>);

impl FormErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FormError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|e| e.message.as_str()).collect();
        write!(f, "{}", messages.join(" "))
    }
}

impl std::error::Error for FormErrors {}

pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub(crate) fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
