//! Permission use cases

mod commands;
mod queries;

pub use commands::{
    CreatePermissionCommand, CreatePermissionHandler, DeletePermissionCommand,
    DeletePermissionHandler, UpdatePermissionCommand, UpdatePermissionHandler,
};
pub use queries::{GetPermissionHandler, ListPermissionsHandler, ListPermissionsQuery};
