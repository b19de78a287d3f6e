//! Role repository trait

use async_trait::async_trait;

use super::entity::Role;
use crate::domain::id::{PermissionId, RoleId};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Repository port for role persistence.
///
/// Implementations enforce role name uniqueness on `create`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, DomainError>;

    /// Batch lookup; unknown IDs are skipped, so callers compare lengths
    async fn find_by_ids(&self, ids: &[RoleId]) -> Result<Vec<Role>, DomainError>;

    /// All roles, highest priority first, then by name
    async fn find_all(&self) -> Result<Vec<Role>, DomainError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, DomainError>;

    async fn exists_by_name(&self, name: &str) -> Result<bool, DomainError>;

    /// Roles granted to every new account
    async fn find_defaults(&self) -> Result<Vec<Role>, DomainError>;

    /// Roles whose permission set contains the given permission
    async fn find_by_permission(&self, permission_id: PermissionId)
        -> Result<Vec<Role>, DomainError>;

    async fn create(&self, role: &Role) -> Result<(), DomainError>;

    async fn update(&self, role: &Role) -> Result<(), DomainError>;

    /// Hard delete; returns false if nothing was removed
    async fn delete(&self, id: RoleId) -> Result<bool, DomainError>;
}
