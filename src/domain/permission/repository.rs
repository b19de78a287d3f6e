//! Permission repository trait

use async_trait::async_trait;

use super::entity::{Permission, PermissionCode};
use crate::domain::id::PermissionId;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Repository port for permission persistence.
///
/// Implementations enforce uniqueness of the `resource:action` code.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn find_by_id(&self, id: PermissionId) -> Result<Option<Permission>, DomainError>;

    /// Batch lookup; unknown IDs are skipped, so callers compare lengths
    async fn find_by_ids(&self, ids: &[PermissionId]) -> Result<Vec<Permission>, DomainError>;

    /// All permissions ordered by code
    async fn find_all(&self) -> Result<Vec<Permission>, DomainError>;

    async fn find_by_code(&self, code: &PermissionCode) -> Result<Option<Permission>, DomainError>;

    async fn create(&self, permission: &Permission) -> Result<(), DomainError>;

    async fn update(&self, permission: &Permission) -> Result<(), DomainError>;

    /// Hard delete; returns false if nothing was removed
    async fn delete(&self, id: PermissionId) -> Result<bool, DomainError>;
}
