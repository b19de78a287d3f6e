//! Session and password reset repository traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::entity::{PasswordResetToken, RevocationReason, Session};
use crate::domain::id::{SessionId, UserId};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Repository port for server-tracked sessions
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, DomainError>;

    /// Lookup by refresh token digest, including revoked sessions
    async fn find_by_refresh_token_hash(&self, hash: &str)
        -> Result<Option<Session>, DomainError>;

    /// Non-revoked, unexpired sessions of a user, oldest first
    async fn find_active_by_user(&self, user_id: UserId) -> Result<Vec<Session>, DomainError>;

    async fn update(&self, session: &Session) -> Result<(), DomainError>;

    /// Revoke one session; returns false if it was unknown or already revoked
    async fn revoke(&self, id: SessionId, reason: RevocationReason) -> Result<bool, DomainError>;

    /// Revoke every live session of a user except `keep`; returns how many were revoked
    async fn revoke_all_for_user(
        &self,
        user_id: UserId,
        reason: RevocationReason,
        keep: Option<SessionId>,
    ) -> Result<usize, DomainError>;

    /// Remove sessions that expired before `now`; returns how many were removed
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError>;
}

/// Repository port for password reset grants
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PasswordResetRepository: Send + Sync {
    async fn create(&self, token: &PasswordResetToken) -> Result<(), DomainError>;

    async fn find_by_token_hash(
        &self,
        hash: &str,
    ) -> Result<Option<PasswordResetToken>, DomainError>;

    /// Mark the grant used if it is still unused. Returns `false` when it was
    /// already used, so only one caller can redeem a grant.
    async fn consume(&self, id: Uuid) -> Result<bool, DomainError>;

    /// Mark every unused grant of a user as used; returns how many changed
    async fn invalidate_all_for_user(&self, user_id: UserId) -> Result<usize, DomainError>;
}
