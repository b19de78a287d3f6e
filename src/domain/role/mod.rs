//! Role domain

mod entity;
mod repository;
mod validation;

pub use entity::{NewRoleParams, Role, RoleDetailsUpdate, RoleSnapshot};
pub use repository::RoleRepository;
pub use validation::{
    validate_display_name, validate_role_description, validate_role_name, RoleValidationError,
};

#[cfg(test)]
pub use repository::MockRoleRepository;
