//! Sessions and password reset grants
//!
//! Sessions are plain records rather than event-emitting aggregates. They back
//! refresh token rotation, logout and per-session revocation.

mod entity;
mod repository;

pub use entity::{ClientInfo, PasswordResetToken, RevocationReason, Session};
pub use repository::{PasswordResetRepository, SessionRepository};

#[cfg(test)]
pub use repository::{MockPasswordResetRepository, MockSessionRepository};
