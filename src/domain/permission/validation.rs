//! Permission validation utilities

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::domain::DomainError;

/// Maximum length of a resource or action segment
pub const MAX_SEGMENT_LENGTH: usize = 64;

/// Maximum length of a permission description
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// A segment is lowercase alphanumerics with `_`, `.`, `-`, or the wildcard `*`
static SEGMENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[a-z0-9][a-z0-9_.\-]*|\*)$").unwrap());

/// Errors that can occur during permission validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PermissionValidationError {
    #[error("Permission {0} cannot be empty")]
    EmptySegment(&'static str),

    #[error("Permission {0} exceeds maximum length of {1} characters")]
    SegmentTooLong(&'static str, usize),

    #[error("Permission {0} '{1}' may only contain lowercase letters, digits, '_', '.', '-' or be '*'")]
    InvalidSegment(&'static str, String),

    #[error("Permission code '{0}' must have the form resource:action")]
    InvalidCode(String),

    #[error("Permission description exceeds maximum length of {0} characters")]
    DescriptionTooLong(usize),
}

impl From<PermissionValidationError> for DomainError {
    fn from(err: PermissionValidationError) -> Self {
        DomainError::validation(err.to_string())
    }
}

/// Validate one half of a permission code.
///
/// `field` names the half ("resource" or "action") for error messages. The
/// value must already be normalized to lowercase.
pub fn validate_segment(field: &'static str, value: &str) -> Result<(), PermissionValidationError> {
    if value.is_empty() {
        return Err(PermissionValidationError::EmptySegment(field));
    }

    if value.len() > MAX_SEGMENT_LENGTH {
        return Err(PermissionValidationError::SegmentTooLong(
            field,
            MAX_SEGMENT_LENGTH,
        ));
    }

    if !SEGMENT_PATTERN.is_match(value) {
        return Err(PermissionValidationError::InvalidSegment(
            field,
            value.to_string(),
        ));
    }

    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), PermissionValidationError> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(PermissionValidationError::DescriptionTooLong(
            MAX_DESCRIPTION_LENGTH,
        ));
    }
    Ok(())
}
