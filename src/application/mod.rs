//! Application layer
//!
//! One handler struct per command or query. Handlers receive their ports as
//! `Arc<dyn ...>`, persist aggregates first and publish the drained domain
//! events afterwards.

pub mod auth;
pub mod dto;
pub mod events;
pub mod permission;
pub mod role;
pub mod user;

#[cfg(test)]
pub(crate) mod testing;

pub use dto::{
    AuthResponseDto, AuthTokensDto, CountDto, MessageDto, PermissionCheckDto, PermissionDto,
    PrincipalDto, RoleDetailDto, RoleDto, SessionDto, UserDto, UserListDto,
};
pub use events::EventPublisher;
