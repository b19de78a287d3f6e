//! Role command handlers

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use crate::application::dto::RoleDto;
use crate::application::EventPublisher;
use crate::domain::{
    DomainError, EventBus, NewRoleParams, PermissionId, PermissionRepository, ResultExt, Role,
    RoleDetailsUpdate, RoleId, RoleRepository, UserRepository, Violation,
};

pub(crate) async fn load_role(roles: &dyn RoleRepository, role_id: RoleId) -> Result<Role, DomainError> {
    roles
        .find_by_id(role_id)
        .await
        .context("load role")?
        .ok_or_else(|| DomainError::not_found(format!("Role '{}' not found", role_id)))
}

/// Fail with `NotFound` unless every permission ID exists
pub(crate) async fn ensure_permissions_exist(
    permissions: &dyn PermissionRepository,
    permission_ids: &[PermissionId],
) -> Result<(), DomainError> {
    let unique: Vec<PermissionId> = permission_ids
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if unique.is_empty() {
        return Ok(());
    }

    let found = permissions
        .find_by_ids(&unique)
        .await
        .context("load permissions")?;
    if found.len() != unique.len() {
        let missing: Vec<String> = unique
            .iter()
            .filter(|id| !found.iter().any(|p| p.id() == **id))
            .map(|id| id.to_string())
            .collect();
        return Err(DomainError::not_found(format!(
            "Permission(s) not found: {}",
            missing.join(", ")
        )));
    }

    Ok(())
}

async fn commit(
    roles: &dyn RoleRepository,
    events: &EventPublisher,
    mut role: Role,
) -> Result<RoleDto, DomainError> {
    roles.update(&role).await.context("save role")?;
    events.publish(role.take_events()).await;
    Ok(RoleDto::from(&role))
}

// CreateRole

#[derive(Debug, Clone)]
pub struct CreateRoleCommand {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub permission_ids: Vec<PermissionId>,
    pub priority: i32,
    pub is_default: bool,
}

pub struct CreateRoleHandler {
    roles: Arc<dyn RoleRepository>,
    permissions: Arc<dyn PermissionRepository>,
    events: EventPublisher,
}

impl CreateRoleHandler {
    pub fn new(roles: Arc<dyn RoleRepository>, permissions: Arc<dyn PermissionRepository>) -> Self {
        Self {
            roles,
            permissions,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    /// Create a custom role. System roles only come from the catalog seed.
    pub async fn handle(&self, cmd: CreateRoleCommand) -> Result<RoleDto, DomainError> {
        let mut params = NewRoleParams::new(cmd.name, cmd.display_name)
            .with_description(cmd.description)
            .with_permissions(cmd.permission_ids)
            .with_priority(cmd.priority);
        if cmd.is_default {
            params = params.as_default();
        }

        let mut role = Role::new(params)?;

        if self
            .roles
            .exists_by_name(role.name())
            .await
            .context("check role name")?
        {
            return Err(DomainError::already_exists(format!(
                "Role '{}' already exists",
                role.name()
            )));
        }

        let permission_ids: Vec<_> = role.permission_ids().iter().copied().collect();
        ensure_permissions_exist(self.permissions.as_ref(), &permission_ids).await?;

        self.roles.create(&role).await.context("create role")?;

        info!(role_id = %role.id(), name = %role.name(), "Role created");

        self.events.publish(role.take_events()).await;
        Ok(RoleDto::from(&role))
    }
}

// UpdateRole

#[derive(Debug, Clone, Default)]
pub struct UpdateRoleCommand {
    pub role_id: RoleId,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i32>,
    pub is_default: Option<bool>,
}

pub struct UpdateRoleHandler {
    roles: Arc<dyn RoleRepository>,
    events: EventPublisher,
}

impl UpdateRoleHandler {
    pub fn new(roles: Arc<dyn RoleRepository>) -> Self {
        Self {
            roles,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    pub async fn handle(&self, cmd: UpdateRoleCommand) -> Result<RoleDto, DomainError> {
        let mut role = load_role(self.roles.as_ref(), cmd.role_id).await?;
        role.update_details(RoleDetailsUpdate {
            display_name: cmd.display_name,
            description: cmd.description,
            priority: cmd.priority,
            is_default: cmd.is_default,
        })?;

        info!(role_id = %role.id(), "Role updated");
        commit(self.roles.as_ref(), &self.events, role).await
    }
}

// DeleteRole

#[derive(Debug, Clone)]
pub struct DeleteRoleCommand {
    pub role_id: RoleId,
}

pub struct DeleteRoleHandler {
    roles: Arc<dyn RoleRepository>,
    users: Arc<dyn UserRepository>,
    events: EventPublisher,
}

impl DeleteRoleHandler {
    pub fn new(roles: Arc<dyn RoleRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self {
            roles,
            users,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    /// Delete a role nobody holds.
    ///
    /// Guards run in order: system, default, then assignment to users.
    pub async fn handle(&self, cmd: DeleteRoleCommand) -> Result<(), DomainError> {
        let mut role = load_role(self.roles.as_ref(), cmd.role_id).await?;

        if role.is_system() {
            return Err(Violation::SystemRoleImmutable.into());
        }
        if role.is_default() {
            return Err(Violation::DefaultRoleNotDeletable.into());
        }

        let holders = self
            .users
            .find_by_role(role.id())
            .await
            .context("find role holders")?;
        if !holders.is_empty() {
            info!(role_id = %role.id(), holders = holders.len(), "Role deletion refused");
            return Err(Violation::RoleInUse.into());
        }

        role.delete()?;
        self.roles.delete(role.id()).await.context("delete role")?;

        info!(role_id = %role.id(), name = %role.name(), "Role deleted");

        self.events.publish(role.take_events()).await;
        Ok(())
    }
}

// Permission assignment

#[derive(Debug, Clone)]
pub struct AssignPermissionCommand {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
}

pub struct AssignPermissionHandler {
    roles: Arc<dyn RoleRepository>,
    permissions: Arc<dyn PermissionRepository>,
    events: EventPublisher,
}

impl AssignPermissionHandler {
    pub fn new(roles: Arc<dyn RoleRepository>, permissions: Arc<dyn PermissionRepository>) -> Self {
        Self {
            roles,
            permissions,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    pub async fn handle(&self, cmd: AssignPermissionCommand) -> Result<RoleDto, DomainError> {
        let mut role = load_role(self.roles.as_ref(), cmd.role_id).await?;
        role.ensure_modifiable()?;

        if self
            .permissions
            .find_by_id(cmd.permission_id)
            .await
            .context("load permission")?
            .is_none()
        {
            return Err(DomainError::not_found(format!(
                "Permission '{}' not found",
                cmd.permission_id
            )));
        }

        role.add_permission(cmd.permission_id)?;

        info!(role_id = %role.id(), permission_id = %cmd.permission_id, "Permission assigned to role");
        commit(self.roles.as_ref(), &self.events, role).await
    }
}

#[derive(Debug, Clone)]
pub struct RemovePermissionCommand {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
}

pub struct RemovePermissionHandler {
    roles: Arc<dyn RoleRepository>,
    events: EventPublisher,
}

impl RemovePermissionHandler {
    pub fn new(roles: Arc<dyn RoleRepository>) -> Self {
        Self {
            roles,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    pub async fn handle(&self, cmd: RemovePermissionCommand) -> Result<RoleDto, DomainError> {
        let mut role = load_role(self.roles.as_ref(), cmd.role_id).await?;
        role.remove_permission(cmd.permission_id)?;

        info!(role_id = %role.id(), permission_id = %cmd.permission_id, "Permission removed from role");
        commit(self.roles.as_ref(), &self.events, role).await
    }
}

#[derive(Debug, Clone)]
pub struct SetRolePermissionsCommand {
    pub role_id: RoleId,
    pub permission_ids: Vec<PermissionId>,
}

pub struct SetRolePermissionsHandler {
    roles: Arc<dyn RoleRepository>,
    permissions: Arc<dyn PermissionRepository>,
    events: EventPublisher,
}

impl SetRolePermissionsHandler {
    pub fn new(roles: Arc<dyn RoleRepository>, permissions: Arc<dyn PermissionRepository>) -> Self {
        Self {
            roles,
            permissions,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    pub async fn handle(&self, cmd: SetRolePermissionsCommand) -> Result<RoleDto, DomainError> {
        let mut role = load_role(self.roles.as_ref(), cmd.role_id).await?;
        role.ensure_modifiable()?;
        ensure_permissions_exist(self.permissions.as_ref(), &cmd.permission_ids).await?;

        if !role.set_permissions(cmd.permission_ids)? {
            return Ok(RoleDto::from(&role));
        }

        info!(role_id = %role.id(), permissions = role.permission_ids().len(), "Role permissions replaced");
        commit(self.roles.as_ref(), &self.events, role).await
    }
}
