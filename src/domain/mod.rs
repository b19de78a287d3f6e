//! Domain layer - Aggregates, value objects, domain events and ports

pub mod auth;
pub mod error;
pub mod event;
pub mod id;
pub mod permission;
pub mod role;
pub mod session;
pub mod user;

pub use auth::{AccessClaims, IssuedToken, PasswordHasher, PasswordResetNotifier, TokenIssuer};
pub use error::{AuthFailure, DomainError, ErrorKind, ResultExt, Violation};
pub use event::{DomainEvent, EventBus, EventEnvelope};
pub use id::{PermissionId, RoleId, SessionId, UserId};
pub use permission::{Permission, PermissionCode, PermissionRepository};
pub use role::{NewRoleParams, Role, RoleDetailsUpdate, RoleRepository};
pub use session::{
    ClientInfo, PasswordResetRepository, PasswordResetToken, RevocationReason, Session,
    SessionRepository,
};
pub use user::{Email, User, UserQuery, UserRepository, UserStatus};
