//! Role query handlers

use std::sync::Arc;

use super::commands::load_role;
use crate::application::dto::{PermissionDto, RoleDetailDto, RoleDto, UserDto};
use crate::domain::{
    DomainError, PermissionRepository, ResultExt, Role, RoleId, RoleRepository, UserRepository,
};

async fn role_permissions(
    permissions: &dyn PermissionRepository,
    role: &Role,
) -> Result<Vec<PermissionDto>, DomainError> {
    let ids: Vec<_> = role.permission_ids().iter().copied().collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut found = permissions
        .find_by_ids(&ids)
        .await
        .context("load permissions")?;
    found.sort_by(|a, b| a.code().cmp(b.code()));

    Ok(found.iter().map(PermissionDto::from).collect())
}

pub struct GetRoleHandler {
    roles: Arc<dyn RoleRepository>,
    permissions: Arc<dyn PermissionRepository>,
}

impl GetRoleHandler {
    pub fn new(roles: Arc<dyn RoleRepository>, permissions: Arc<dyn PermissionRepository>) -> Self {
        Self { roles, permissions }
    }

    pub async fn handle(&self, role_id: RoleId) -> Result<RoleDetailDto, DomainError> {
        let role = load_role(self.roles.as_ref(), role_id).await?;
        let permissions = role_permissions(self.permissions.as_ref(), &role).await?;

        Ok(RoleDetailDto {
            role: RoleDto::from(&role),
            permissions,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListRolesQuery {
    pub exclude_system: bool,
}

pub struct ListRolesHandler {
    roles: Arc<dyn RoleRepository>,
}

impl ListRolesHandler {
    pub fn new(roles: Arc<dyn RoleRepository>) -> Self {
        Self { roles }
    }

    /// All roles, highest priority first
    pub async fn handle(&self, query: ListRolesQuery) -> Result<Vec<RoleDto>, DomainError> {
        let roles = self.roles.find_all().await.context("list roles")?;

        Ok(roles
            .iter()
            .filter(|role| !(query.exclude_system && role.is_system()))
            .map(RoleDto::from)
            .collect())
    }
}

pub struct GetRolePermissionsHandler {
    roles: Arc<dyn RoleRepository>,
    permissions: Arc<dyn PermissionRepository>,
}

impl GetRolePermissionsHandler {
    pub fn new(roles: Arc<dyn RoleRepository>, permissions: Arc<dyn PermissionRepository>) -> Self {
        Self { roles, permissions }
    }

    pub async fn handle(&self, role_id: RoleId) -> Result<Vec<PermissionDto>, DomainError> {
        let role = load_role(self.roles.as_ref(), role_id).await?;
        role_permissions(self.permissions.as_ref(), &role).await
    }
}

pub struct GetUsersWithRoleHandler {
    roles: Arc<dyn RoleRepository>,
    users: Arc<dyn UserRepository>,
}

impl GetUsersWithRoleHandler {
    pub fn new(roles: Arc<dyn RoleRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { roles, users }
    }

    pub async fn handle(&self, role_id: RoleId) -> Result<Vec<UserDto>, DomainError> {
        let role = load_role(self.roles.as_ref(), role_id).await?;
        let users = self
            .users
            .find_by_role(role.id())
            .await
            .context("find role holders")?;

        Ok(users.iter().map(UserDto::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::TestContext;
    use crate::domain::{ErrorKind, NewRoleParams};

    #[tokio::test]
    async fn test_get_role_with_permissions() {
        let ctx = TestContext::new();
        let write = ctx.seed_permission("posts", "write").await;
        let read = ctx.seed_permission("posts", "read").await;
        let role = ctx
            .seed_role(
                NewRoleParams::new("editor", "Editor").with_permissions(vec![write.id(), read.id()]),
            )
            .await;

        let detail = GetRoleHandler::new(ctx.roles.clone(), ctx.permissions.clone())
            .handle(role.id())
            .await
            .unwrap();

        assert_eq!(detail.role.name, "editor");
        let codes: Vec<_> = detail.permissions.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["posts:read", "posts:write"]);

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["name"], "editor");
        assert_eq!(json["permissions"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_missing_role() {
        let ctx = TestContext::new();
        let err = GetRoleHandler::new(ctx.roles.clone(), ctx.permissions.clone())
            .handle(RoleId::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_roles_excluding_system() {
        let ctx = TestContext::new();
        ctx.seed_role(NewRoleParams::new("admin", "Admin").as_system().with_priority(100))
            .await;
        ctx.seed_role(NewRoleParams::new("editor", "Editor").with_priority(10))
            .await;
        let handler = ListRolesHandler::new(ctx.roles.clone());

        let all = handler.handle(ListRolesQuery::default()).await.unwrap();
        let names: Vec<_> = all.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["admin", "editor"]);

        let custom = handler
            .handle(ListRolesQuery {
                exclude_system: true,
            })
            .await
            .unwrap();
        assert_eq!(custom.len(), 1);
        assert_eq!(custom[0].name, "editor");
    }

    #[tokio::test]
    async fn test_role_permissions_and_holders() {
        let ctx = TestContext::new();
        let read = ctx.seed_permission("posts", "read").await;
        let role = ctx
            .seed_role(NewRoleParams::new("reader", "Reader").with_permissions(vec![read.id()]))
            .await;
        let mut user = ctx.seed_user("reader@x.com").await;
        user.assign_role(role.id()).unwrap();
        ctx.users.update(&user).await.unwrap();
        ctx.seed_user("other@x.com").await;

        let permissions = GetRolePermissionsHandler::new(ctx.roles.clone(), ctx.permissions.clone())
            .handle(role.id())
            .await
            .unwrap();
        assert_eq!(permissions.len(), 1);
        assert_eq!(permissions[0].code, "posts:read");

        let holders = GetUsersWithRoleHandler::new(ctx.roles.clone(), ctx.users.clone())
            .handle(role.id())
            .await
            .unwrap();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].email, "reader@x.com");
    }
}
