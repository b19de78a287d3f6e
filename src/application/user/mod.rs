//! User use cases

mod account;
mod commands;
mod queries;

pub(crate) use account::{create_account, NewAccount};
pub use commands::{
    ActivateUserCommand, ActivateUserHandler, AssignRoleCommand, AssignRoleHandler,
    BanUserCommand, BanUserHandler, ChangePasswordCommand, ChangePasswordHandler,
    CreateUserCommand, CreateUserHandler, DeactivateUserCommand, DeactivateUserHandler,
    DeleteUserCommand, DeleteUserHandler, RevokeRoleCommand, RevokeRoleHandler,
    SetUserRolesCommand, SetUserRolesHandler, UpdateProfileCommand, UpdateProfileHandler,
};
pub use queries::{
    CheckPermissionHandler, CheckPermissionQuery, GetUserHandler, GetUserPermissionsHandler,
    GetUserRolesHandler, ListUsersHandler, ListUsersQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
