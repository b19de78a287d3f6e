//! Permission domain
//!
//! A permission is a `resource:action` pair. Roles reference permissions by ID.

mod entity;
mod repository;
mod validation;

pub use entity::{Permission, PermissionCode, PermissionSnapshot};
pub use repository::PermissionRepository;
pub use validation::{validate_description, validate_segment, PermissionValidationError};

#[cfg(test)]
pub use repository::MockPermissionRepository;
