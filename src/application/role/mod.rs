//! Role use cases

mod commands;
mod queries;

pub use commands::{
    AssignPermissionCommand, AssignPermissionHandler, CreateRoleCommand, CreateRoleHandler,
    DeleteRoleCommand, DeleteRoleHandler, RemovePermissionCommand, RemovePermissionHandler,
    SetRolePermissionsCommand, SetRolePermissionsHandler, UpdateRoleCommand, UpdateRoleHandler,
};
pub use queries::{
    GetRoleHandler, GetRolePermissionsHandler, GetUsersWithRoleHandler, ListRolesHandler,
    ListRolesQuery,
};
