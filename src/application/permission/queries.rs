//! Permission query handlers

use std::sync::Arc;

use super::commands::load_permission;
use crate::application::dto::PermissionDto;
use crate::domain::{DomainError, PermissionId, PermissionRepository, ResultExt};

pub struct GetPermissionHandler {
    permissions: Arc<dyn PermissionRepository>,
}

impl GetPermissionHandler {
    pub fn new(permissions: Arc<dyn PermissionRepository>) -> Self {
        Self { permissions }
    }

    pub async fn handle(&self, permission_id: PermissionId) -> Result<PermissionDto, DomainError> {
        let permission = load_permission(self.permissions.as_ref(), permission_id).await?;
        Ok(PermissionDto::from(&permission))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListPermissionsQuery {
    /// Only permissions on this resource
    pub resource: Option<String>,
}

pub struct ListPermissionsHandler {
    permissions: Arc<dyn PermissionRepository>,
}

impl ListPermissionsHandler {
    pub fn new(permissions: Arc<dyn PermissionRepository>) -> Self {
        Self { permissions }
    }

    pub async fn handle(&self, query: ListPermissionsQuery) -> Result<Vec<PermissionDto>, DomainError> {
        let resource = query
            .resource
            .map(|r| r.trim().to_lowercase())
            .filter(|r| !r.is_empty());

        let all = self
            .permissions
            .find_all()
            .await
            .context("list permissions")?;

        Ok(all
            .iter()
            .filter(|p| resource.as_deref().is_none_or(|r| p.resource() == r))
            .map(PermissionDto::from)
            .collect())
    }
}
