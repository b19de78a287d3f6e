//! Role validation utilities

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::domain::DomainError;

const MAX_NAME_LENGTH: usize = 50;
const MAX_DISPLAY_NAME_LENGTH: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 500;

static ROLE_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_\-]*$").unwrap());

/// Errors that can occur during role validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoleValidationError {
    #[error("Role name cannot be empty")]
    EmptyName,

    #[error("Role name exceeds maximum length of {0} characters")]
    NameTooLong(usize),

    #[error("Role name '{0}' must start with a lowercase letter and contain only lowercase letters, digits, '_' or '-'")]
    InvalidName(String),

    #[error("Role display name cannot be empty")]
    EmptyDisplayName,

    #[error("Role display name exceeds maximum length of {0} characters")]
    DisplayNameTooLong(usize),

    #[error("Role description exceeds maximum length of {0} characters")]
    DescriptionTooLong(usize),
}

impl From<RoleValidationError> for DomainError {
    fn from(err: RoleValidationError) -> Self {
        DomainError::validation(err.to_string())
    }
}

/// Validate a role name (expects the trimmed, lower-cased form)
pub fn validate_role_name(name: &str) -> Result<(), RoleValidationError> {
    if name.is_empty() {
        return Err(RoleValidationError::EmptyName);
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(RoleValidationError::NameTooLong(MAX_NAME_LENGTH));
    }

    if !ROLE_NAME_PATTERN.is_match(name) {
        return Err(RoleValidationError::InvalidName(name.to_string()));
    }

    Ok(())
}

pub fn validate_display_name(display_name: &str) -> Result<(), RoleValidationError> {
    if display_name.is_empty() {
        return Err(RoleValidationError::EmptyDisplayName);
    }

    if display_name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(RoleValidationError::DisplayNameTooLong(
            MAX_DISPLAY_NAME_LENGTH,
        ));
    }

    Ok(())
}

pub fn validate_role_description(description: &str) -> Result<(), RoleValidationError> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(RoleValidationError::DescriptionTooLong(
            MAX_DESCRIPTION_LENGTH,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_role_names() {
        assert!(validate_role_name("editor").is_ok());
        assert!(validate_role_name("content-admin").is_ok());
        assert!(validate_role_name("tier_2").is_ok());
    }

    #[test]
    fn test_invalid_role_names() {
        assert_eq!(validate_role_name(""), Err(RoleValidationError::EmptyName));
        assert!(validate_role_name("2fast").is_err());
        assert!(validate_role_name("has space").is_err());
        assert!(validate_role_name("Editor").is_err());
        assert_eq!(
            validate_role_name(&"a".repeat(51)),
            Err(RoleValidationError::NameTooLong(50))
        );
    }

    #[test]
    fn test_display_name() {
        assert!(validate_display_name("Editor").is_ok());
        assert_eq!(
            validate_display_name(""),
            Err(RoleValidationError::EmptyDisplayName)
        );
        assert!(validate_display_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_description() {
        assert!(validate_role_description("").is_ok());
        assert!(validate_role_description(&"x".repeat(501)).is_err());
    }
}
