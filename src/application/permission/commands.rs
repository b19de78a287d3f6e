//! Permission command handlers

use std::sync::Arc;

use tracing::info;

use crate::application::dto::PermissionDto;
use crate::application::EventPublisher;
use crate::domain::{
    DomainError, EventBus, Permission, PermissionId, PermissionRepository, ResultExt,
    RoleRepository, Violation,
};

pub(crate) async fn load_permission(
    permissions: &dyn PermissionRepository,
    permission_id: PermissionId,
) -> Result<Permission, DomainError> {
    permissions
        .find_by_id(permission_id)
        .await
        .context("load permission")?
        .ok_or_else(|| DomainError::not_found(format!("Permission '{}' not found", permission_id)))
}

#[derive(Debug, Clone)]
pub struct CreatePermissionCommand {
    pub resource: String,
    pub action: String,
    pub description: String,
}

pub struct CreatePermissionHandler {
    permissions: Arc<dyn PermissionRepository>,
    events: EventPublisher,
}

impl CreatePermissionHandler {
    pub fn new(permissions: Arc<dyn PermissionRepository>) -> Self {
        Self {
            permissions,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    pub async fn handle(&self, cmd: CreatePermissionCommand) -> Result<PermissionDto, DomainError> {
        let mut permission = Permission::new(&cmd.resource, &cmd.action, cmd.description)?;

        if self
            .permissions
            .find_by_code(permission.code())
            .await
            .context("find permission by code")?
            .is_some()
        {
            return Err(DomainError::already_exists(format!(
                "Permission '{}' already exists",
                permission.code()
            )));
        }

        self.permissions
            .create(&permission)
            .await
            .context("create permission")?;

        info!(permission_id = %permission.id(), code = %permission.code(), "Permission created");

        self.events.publish(permission.take_events()).await;
        Ok(PermissionDto::from(&permission))
    }
}

#[derive(Debug, Clone)]
pub struct UpdatePermissionCommand {
    pub permission_id: PermissionId,
    pub description: String,
}

pub struct UpdatePermissionHandler {
    permissions: Arc<dyn PermissionRepository>,
    events: EventPublisher,
}

impl UpdatePermissionHandler {
    pub fn new(permissions: Arc<dyn PermissionRepository>) -> Self {
        Self {
            permissions,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    /// Only the description is editable; the code is the identity
    pub async fn handle(&self, cmd: UpdatePermissionCommand) -> Result<PermissionDto, DomainError> {
        let mut permission = load_permission(self.permissions.as_ref(), cmd.permission_id).await?;
        permission.update_description(cmd.description)?;

        self.permissions
            .update(&permission)
            .await
            .context("save permission")?;

        info!(permission_id = %permission.id(), "Permission updated");

        self.events.publish(permission.take_events()).await;
        Ok(PermissionDto::from(&permission))
    }
}

#[derive(Debug, Clone)]
pub struct DeletePermissionCommand {
    pub permission_id: PermissionId,
}

pub struct DeletePermissionHandler {
    permissions: Arc<dyn PermissionRepository>,
    roles: Arc<dyn RoleRepository>,
    events: EventPublisher,
}

impl DeletePermissionHandler {
    pub fn new(permissions: Arc<dyn PermissionRepository>, roles: Arc<dyn RoleRepository>) -> Self {
        Self {
            permissions,
            roles,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    pub async fn handle(&self, cmd: DeletePermissionCommand) -> Result<(), DomainError> {
        let mut permission = load_permission(self.permissions.as_ref(), cmd.permission_id).await?;

        if permission.is_system() {
            return Err(Violation::SystemPermissionImmutable.into());
        }

        let holders = self
            .roles
            .find_by_permission(permission.id())
            .await
            .context("find roles holding permission")?;
        if !holders.is_empty() {
            return Err(Violation::PermissionInUse.into());
        }

        permission.delete()?;
        self.permissions
            .delete(permission.id())
            .await
            .context("delete permission")?;

        info!(permission_id = %permission.id(), code = %permission.code(), "Permission deleted");

        self.events.publish(permission.take_events()).await;
        Ok(())
    }
}
