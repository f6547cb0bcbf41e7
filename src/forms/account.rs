use serde::Serialize;
use std::path::PathBuf;

use super::{is_blank, optional, FormError, FormErrors};
use crate::models::SessionUser;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<LoginRequest, FormError> {
        if is_blank(&self.email) {
            return Err(FormError::new("email", "Email and password are required."));
        }
        if self.password.is_empty() {
            return Err(FormError::new("password", "Email and password are required."));
        }

        Ok(LoginRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub photo: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignupSubmission {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone_number: Option<String>,
    pub photo: Option<PathBuf>,
}

impl SignupForm {
    /// Summary shown above the form when any field fails
    pub const INCOMPLETE: &'static str = "Please fill in all required fields.";

    pub fn validate(&self) -> Result<SignupSubmission, FormErrors> {
        let mut errors = FormErrors::default();
        if is_blank(&self.first_name) {
            errors.push("first_name", "First name is required.");
        }
        if is_blank(&self.last_name) {
            errors.push("last_name", "Last name is required.");
        }
        if is_blank(&self.email) {
            errors.push("email", "Email is required.");
        }
        if is_blank(&self.password) {
            errors.push("password", "Password is required.");
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(SignupSubmission {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            phone_number: optional(&self.phone),
            photo: self.photo.clone(),
        })
    }
}

impl SignupSubmission {
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("first_name", self.first_name.clone()),
            ("last_name", self.last_name.clone()),
            ("email", self.email.clone()),
            ("password", self.password.clone()),
        ];
        if let Some(phone) = &self.phone_number {
            fields.push(("phone_number", phone.clone()));
        }
        fields
    }
}

/// Account settings: display name, email, phone and photo
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub photo: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileSubmission {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub photo: Option<PathBuf>,
}

impl ProfileForm {
    pub fn from_user(user: Option<&SessionUser>, remembered_phone: Option<String>) -> Self {
        let mut form = ProfileForm::default();
        if let Some(user) = user {
            form.name = if !user.name.is_empty() {
                user.name.clone()
            } else {
                [user.first_name.as_deref(), user.last_name.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            form.email = user.email.clone();
            form.phone = user.phone_number.clone().unwrap_or_default();
        }
        if let Some(phone) = remembered_phone.filter(|p| !p.is_empty()) {
            form.phone = phone;
        }
        form
    }

    /// Split the display name on its first space into first/last name
    pub fn to_submission(&self) -> ProfileSubmission {
        let (first, last) = match self.name.trim().split_once(' ') {
            Some((first, rest)) => (first, rest.trim()),
            None => (self.name.trim(), ""),
        };

        ProfileSubmission {
            first_name: optional(first),
            last_name: optional(last),
            email: optional(&self.email),
            phone_number: optional(&self.phone),
            photo: self.photo.clone(),
        }
    }
}

impl ProfileSubmission {
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
            ("phone_number", &self.phone_number),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PasswordForm {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

impl PasswordForm {
    pub fn validate(&self) -> Result<PasswordChange, FormError> {
        if self.current_password.is_empty() || self.new_password.is_empty() {
            let field = if self.current_password.is_empty() {
                "current_password"
            } else {
                "new_password"
            };
            return Err(FormError::new(field, "Current and new password are required."));
        }
        if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(FormError::new(
                "new_password",
                format!("New password must be at least {MIN_PASSWORD_LEN} characters."),
            ));
        }

        Ok(PasswordChange {
            current_password: self.current_password.clone(),
            new_password: self.new_password.clone(),
        })
    }
}
