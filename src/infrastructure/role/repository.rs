//! In-memory role repository implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::role::{Role, RoleRepository, RoleSnapshot};
use crate::domain::{DomainError, PermissionId, RoleId};

/// In-memory implementation of RoleRepository
#[derive(Debug, Default)]
pub struct InMemoryRoleRepository {
    roles: Arc<RwLock<HashMap<RoleId, RoleSnapshot>>>,
    should_fail: Arc<RwLock<bool>>,
}

impl InMemoryRoleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roles(roles: Vec<Role>) -> Self {
        let rows = roles
            .iter()
            .map(|role| (role.id(), role.to_snapshot()))
            .collect();

        Self {
            roles: Arc::new(RwLock::new(rows)),
            should_fail: Arc::new(RwLock::new(false)),
        }
    }

    /// Set whether operations should fail
    pub async fn set_should_fail(&self, fail: bool) {
        *self.should_fail.write().await = fail;
    }

    async fn check_should_fail(&self) -> Result<(), DomainError> {
        if *self.should_fail.read().await {
            return Err(DomainError::infrastructure(
                "In-memory role repository configured to fail",
            ));
        }
        Ok(())
    }

    fn sorted(rows: impl Iterator<Item = RoleSnapshot>) -> Vec<Role> {
        let mut roles: Vec<Role> = rows.map(Role::reconstruct).collect();
        roles.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.name().cmp(b.name()))
        });
        roles
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, DomainError> {
        self.check_should_fail().await?;
        let roles = self.roles.read().await;
        Ok(roles.get(&id).cloned().map(Role::reconstruct))
    }

    async fn find_by_ids(&self, ids: &[RoleId]) -> Result<Vec<Role>, DomainError> {
        self.check_should_fail().await?;
        let roles = self.roles.read().await;

        let mut seen = std::collections::HashSet::new();
        Ok(ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| roles.get(id).cloned())
            .map(Role::reconstruct)
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<Role>, DomainError> {
        self.check_should_fail().await?;
        let roles = self.roles.read().await;
        Ok(Self::sorted(roles.values().cloned()))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, DomainError> {
        self.check_should_fail().await?;
        let name = name.trim().to_lowercase();
        let roles = self.roles.read().await;

        Ok(roles
            .values()
            .find(|row| row.name == name)
            .cloned()
            .map(Role::reconstruct))
    }

    async fn exists_by_name(&self, name: &str) -> Result<bool, DomainError> {
        Ok(self.find_by_name(name).await?.is_some())
    }

    async fn find_defaults(&self) -> Result<Vec<Role>, DomainError> {
        self.check_should_fail().await?;
        let roles = self.roles.read().await;
        Ok(Self::sorted(
            roles.values().filter(|row| row.is_default).cloned(),
        ))
    }

    async fn find_by_permission(
        &self,
        permission_id: PermissionId,
    ) -> Result<Vec<Role>, DomainError> {
        self.check_should_fail().await?;
        let roles = self.roles.read().await;
        Ok(Self::sorted(
            roles
                .values()
                .filter(|row| row.permission_ids.contains(&permission_id))
                .cloned(),
        ))
    }

    async fn create(&self, role: &Role) -> Result<(), DomainError> {
        self.check_should_fail().await?;
        let mut roles = self.roles.write().await;

        if roles.contains_key(&role.id()) {
            return Err(DomainError::already_exists(format!(
                "Role with ID '{}' already exists",
                role.id()
            )));
        }

        if roles.values().any(|row| row.name == role.name()) {
            return Err(DomainError::already_exists(format!(
                "Role '{}' already exists",
                role.name()
            )));
        }

        roles.insert(role.id(), role.to_snapshot());
        Ok(())
    }

    async fn update(&self, role: &Role) -> Result<(), DomainError> {
        self.check_should_fail().await?;
        let mut roles = self.roles.write().await;

        if !roles.contains_key(&role.id()) {
            return Err(DomainError::not_found(format!(
                "Role '{}' not found",
                role.id()
            )));
        }

        roles.insert(role.id(), role.to_snapshot());
        Ok(())
    }

    async fn delete(&self, id: RoleId) -> Result<bool, DomainError> {
        self.check_should_fail().await?;
        let mut roles = self.roles.write().await;
        Ok(roles.remove(&id).is_some())
    }
}
