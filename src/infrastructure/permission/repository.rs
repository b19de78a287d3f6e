//! In-memory permission repository implementation

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::permission::{
    Permission, PermissionCode, PermissionRepository, PermissionSnapshot,
};
use crate::domain::{DomainError, PermissionId};

/// In-memory implementation of PermissionRepository
#[derive(Debug, Default)]
pub struct InMemoryPermissionRepository {
    permissions: Arc<RwLock<HashMap<PermissionId, PermissionSnapshot>>>,
    should_fail: Arc<RwLock<bool>>,
}

impl InMemoryPermissionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_permissions(permissions: Vec<Permission>) -> Self {
        let rows = permissions
            .iter()
            .map(|p| (p.id(), p.to_snapshot()))
            .collect();

        Self {
            permissions: Arc::new(RwLock::new(rows)),
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
                "In-memory permission repository configured to fail",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PermissionRepository for InMemoryPermissionRepository {
    async fn find_by_id(&self, id: PermissionId) -> Result<Option<Permission>, DomainError> {
        self.check_should_fail().await?;
        let permissions = self.permissions.read().await;
        Ok(permissions.get(&id).cloned().map(Permission::reconstruct))
    }

    async fn find_by_ids(&self, ids: &[PermissionId]) -> Result<Vec<Permission>, DomainError> {
        self.check_should_fail().await?;
        let permissions = self.permissions.read().await;

        let mut seen = HashSet::new();
        Ok(ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| permissions.get(id).cloned())
            .map(Permission::reconstruct)
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<Permission>, DomainError> {
        self.check_should_fail().await?;
        let permissions = self.permissions.read().await;

        let mut all: Vec<Permission> = permissions
            .values()
            .cloned()
            .map(Permission::reconstruct)
            .collect();
        all.sort_by(|a, b| a.code().cmp(b.code()));
        Ok(all)
    }

    async fn find_by_code(&self, code: &PermissionCode) -> Result<Option<Permission>, DomainError> {
        self.check_should_fail().await?;
        let permissions = self.permissions.read().await;

        Ok(permissions
            .values()
            .find(|row| row.code == *code)
            .cloned()
            .map(Permission::reconstruct))
    }

    async fn create(&self, permission: &Permission) -> Result<(), DomainError> {
        self.check_should_fail().await?;
        let mut permissions = self.permissions.write().await;

        if permissions.contains_key(&permission.id()) {
            return Err(DomainError::already_exists(format!(
                "Permission with ID '{}' already exists",
                permission.id()
            )));
        }

        if permissions.values().any(|row| row.code == *permission.code()) {
            return Err(DomainError::already_exists(format!(
                "Permission '{}' already exists",
                permission.code()
            )));
        }

        permissions.insert(permission.id(), permission.to_snapshot());
        Ok(())
    }

    async fn update(&self, permission: &Permission) -> Result<(), DomainError> {
        self.check_should_fail().await?;
        let mut permissions = self.permissions.write().await;

        if !permissions.contains_key(&permission.id()) {
            return Err(DomainError::not_found(format!(
                "Permission '{}' not found",
                permission.id()
            )));
        }

        permissions.insert(permission.id(), permission.to_snapshot());
        Ok(())
    }

    async fn delete(&self, id: PermissionId) -> Result<bool, DomainError> {
        self.check_should_fail().await?;
        let mut permissions = self.permissions.write().await;
        Ok(permissions.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find_by_code() {
        let repo = InMemoryPermissionRepository::new();
        let read = Permission::new("users", "read", "").unwrap();
        repo.create(&read).await.unwrap();

        let code = PermissionCode::parse("users:read").unwrap();
        let found = repo.find_by_code(&code).await.unwrap().unwrap();
        assert_eq!(found.id(), read.id());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let repo = InMemoryPermissionRepository::new();
        repo.create(&Permission::new("users", "read", "").unwrap())
            .await
            .unwrap();

        let err = repo
            .create(&Permission::new("USERS", "read", "again").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_find_all_sorted_by_code() {
        let repo = InMemoryPermissionRepository::with_permissions(vec![
            Permission::new("users", "write", "").unwrap(),
            Permission::new("roles", "read", "").unwrap(),
        ]);

        let codes: Vec<String> = repo
            .find_all()
            .await
            .unwrap()
            .iter()
            .map(|p| p.code().to_string())
            .collect();
        assert_eq!(codes, vec!["roles:read", "users:write"]);
    }

    #[tokio::test]
    async fn test_find_by_ids_count_reveals_missing() {
        let read = Permission::new("users", "read", "").unwrap();
        let repo = InMemoryPermissionRepository::with_permissions(vec![read.clone()]);

        let found = repo
            .find_by_ids(&[read.id(), PermissionId::new()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
