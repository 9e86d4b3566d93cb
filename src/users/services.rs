use argon2::{password_hash::SaltString, Argon2, PasswordHasher};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use tracing::error;

use super::{dto::UpdateUserRequest, repo_types::UserChanges};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("Required First Name")]
    RequiredFirstName,
    #[error("Required Last Name")]
    RequiredLastName,
    #[error("Required Email")]
    RequiredEmail,
    #[error("Invalid Email")]
    InvalidEmail,
}

/// Normalize an update body before validation.
pub fn prepare(req: &mut UpdateUserRequest) {
    for field in [
        &mut req.first_name,
        &mut req.last_name,
        &mut req.email,
        &mut req.phone,
    ] {
        let trimmed = field.trim();
        if trimmed.len() != field.len() {
            *field = trimmed.to_string();
        }
    }
    if req.password.as_deref().is_some_and(str::is_empty) {
        req.password = None;
    }
}

/// Collect every field-level problem, in field order.
pub fn validate(req: &UpdateUserRequest) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    if req.first_name.is_empty() {
        errors.push(FieldError::RequiredFirstName);
    }
    if req.last_name.is_empty() {
        errors.push(FieldError::RequiredLastName);
    }
    if req.email.is_empty() {
        errors.push(FieldError::RequiredEmail);
    } else if !is_valid_email(&req.email) {
        errors.push(FieldError::InvalidEmail);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validation_message(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Turn a prepared, validated body into store changes, hashing any new password.
pub fn into_changes(req: UpdateUserRequest) -> anyhow::Result<UserChanges> {
    let password_hash = req.password.as_deref().map(hash_password).transpose()?;
    Ok(UserChanges {
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        phone: req.phone,
        password_hash,
    })
}

/// Human-readable message for a failed update.
pub fn format_error(message: &str) -> String {
    let message = message.to_ascii_lowercase();
    if message.contains("email") {
        "Email Already Taken".into()
    } else if message.contains("phone") {
        "Phone Already Taken".into()
    } else {
        "Incorrect Details".into()
    }
}
