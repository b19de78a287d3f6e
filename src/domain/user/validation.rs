//! User validation utilities

use thiserror::Error;
use validator::ValidateEmail;

use crate::domain::DomainError;

/// Errors that can occur during user validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserValidationError {
    #[error("Email cannot be empty")]
    EmptyEmail,

    #[error("Email exceeds maximum length of {0} characters")]
    EmailTooLong(usize),

    #[error("Email '{0}' is not a valid address")]
    InvalidEmail(String),

    #[error("Full name cannot be empty")]
    EmptyFullName,

    #[error("Full name exceeds maximum length of {0} characters")]
    FullNameTooLong(usize),

    #[error("Password is too short. Minimum length is {0} characters")]
    PasswordTooShort(usize),

    #[error("Password exceeds maximum length of {0} characters")]
    PasswordTooLong(usize),

    #[error("Password must contain at least one uppercase letter")]
    PasswordMissingUppercase,

    #[error("Password must contain at least one lowercase letter")]
    PasswordMissingLowercase,

    #[error("Password must contain at least one digit")]
    PasswordMissingDigit,

    #[error("Password must contain at least one special character")]
    PasswordMissingSpecial,

    #[error("Ban reason cannot be empty")]
    EmptyBanReason,
}

impl From<UserValidationError> for DomainError {
    fn from(err: UserValidationError) -> Self {
        DomainError::validation(err.to_string())
    }
}

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_FULL_NAME_LENGTH: usize = 100;
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Validate an email address (expects the canonical, trimmed form)
pub fn validate_email(email: &str) -> Result<(), UserValidationError> {
    if email.is_empty() {
        return Err(UserValidationError::EmptyEmail);
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(UserValidationError::EmailTooLong(MAX_EMAIL_LENGTH));
    }

    if !email.validate_email() {
        return Err(UserValidationError::InvalidEmail(email.to_string()));
    }

    Ok(())
}

/// Validate a full name
///
/// Rules:
/// - Cannot be empty or whitespace only
/// - Maximum 100 characters
pub fn validate_full_name(full_name: &str) -> Result<(), UserValidationError> {
    let trimmed = full_name.trim();

    if trimmed.is_empty() {
        return Err(UserValidationError::EmptyFullName);
    }

    if trimmed.chars().count() > MAX_FULL_NAME_LENGTH {
        return Err(UserValidationError::FullNameTooLong(MAX_FULL_NAME_LENGTH));
    }

    Ok(())
}

/// Validate a password against the strength policy
///
/// Rules:
/// - Minimum 8 characters
/// - Maximum 128 characters
/// - At least one uppercase letter, one lowercase letter, one digit
///   and one non-alphanumeric character
pub fn validate_password(password: &str) -> Result<(), UserValidationError> {
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        return Err(UserValidationError::PasswordTooShort(MIN_PASSWORD_LENGTH));
    }

    if length > MAX_PASSWORD_LENGTH {
        return Err(UserValidationError::PasswordTooLong(MAX_PASSWORD_LENGTH));
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(UserValidationError::PasswordMissingUppercase);
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(UserValidationError::PasswordMissingLowercase);
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(UserValidationError::PasswordMissingDigit);
    }

    if password.chars().all(|c| c.is_alphanumeric()) {
        return Err(UserValidationError::PasswordMissingSpecial);
    }

    Ok(())
}
