//! User domain
//!
//! This module provides the user aggregate, its account lifecycle, email and
//! password validation, and the repository port.

mod email;
mod entity;
mod repository;
mod validation;

pub use email::Email;
pub use entity::{User, UserSnapshot, UserStatus};
pub use repository::{UserQuery, UserRepository};
pub use validation::{validate_email, validate_full_name, validate_password, UserValidationError};

#[cfg(test)]
pub use repository::MockUserRepository;
