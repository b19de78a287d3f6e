//! User query handlers

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::application::dto::{PermissionCheckDto, PermissionDto, RoleDto, UserDto, UserListDto};
use crate::domain::{
    DomainError, Permission, PermissionCode, PermissionId, PermissionRepository, ResultExt,
    RoleId, RoleRepository, User, UserId, UserQuery, UserRepository, UserStatus,
};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

async fn load_user(users: &dyn UserRepository, user_id: UserId) -> Result<User, DomainError> {
    users
        .find_by_id(user_id)
        .await
        .context("load user")?
        .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", user_id)))
}

/// Every permission reachable through the user's roles, sorted by code
async fn effective_permissions(
    roles: &dyn RoleRepository,
    permissions: &dyn PermissionRepository,
    user: &User,
) -> Result<Vec<Permission>, DomainError> {
    let role_ids: Vec<_> = user.role_ids().iter().copied().collect();
    if role_ids.is_empty() {
        return Ok(Vec::new());
    }

    let held_roles = roles.find_by_ids(&role_ids).await.context("load roles")?;
    let permission_ids: Vec<PermissionId> = held_roles
        .iter()
        .flat_map(|role| role.permission_ids().iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if permission_ids.is_empty() {
        return Ok(Vec::new());
    }

    let found = permissions
        .find_by_ids(&permission_ids)
        .await
        .context("load permissions")?;

    let by_code: BTreeMap<String, Permission> = found
        .into_iter()
        .map(|p| (p.code().to_string(), p))
        .collect();
    Ok(by_code.into_values().collect())
}

// GetUser

pub struct GetUserHandler {
    users: Arc<dyn UserRepository>,
}

impl GetUserHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn handle(&self, user_id: UserId) -> Result<UserDto, DomainError> {
        let user = load_user(self.users.as_ref(), user_id).await?;
        Ok(UserDto::from(&user))
    }
}

// ListUsers

#[derive(Debug, Clone, Default)]
pub struct ListUsersQuery {
    pub status: Option<UserStatus>,
    pub role_id: Option<RoleId>,
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub struct ListUsersHandler {
    users: Arc<dyn UserRepository>,
}

impl ListUsersHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn handle(&self, query: ListUsersQuery) -> Result<UserListDto, DomainError> {
        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = query.offset.unwrap_or(0);

        let mut filter = UserQuery::new();
        if let Some(status) = query.status {
            filter = filter.with_status(status);
        }
        if let Some(role_id) = query.role_id {
            filter = filter.with_role(role_id);
        }
        if let Some(search) = query.search.filter(|s| !s.trim().is_empty()) {
            filter = filter.with_search(search);
        }

        let total = self.users.count(&filter).await.context("count users")?;
        let page = self
            .users
            .list(&filter.with_limit(limit).with_offset(offset))
            .await
            .context("list users")?;

        debug!(total, returned = page.len(), limit, offset, "Listed users");

        Ok(UserListDto {
            users: page.iter().map(UserDto::from).collect(),
            total,
            limit: Some(limit),
            offset: Some(offset),
        })
    }
}

// GetUserRoles

pub struct GetUserRolesHandler {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
}

impl GetUserRolesHandler {
    pub fn new(users: Arc<dyn UserRepository>, roles: Arc<dyn RoleRepository>) -> Self {
        Self { users, roles }
    }

    /// Roles held by the user, highest priority first
    pub async fn handle(&self, user_id: UserId) -> Result<Vec<RoleDto>, DomainError> {
        let user = load_user(self.users.as_ref(), user_id).await?;
        let role_ids: Vec<_> = user.role_ids().iter().copied().collect();
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut roles = self.roles.find_by_ids(&role_ids).await.context("load roles")?;
        roles.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.name().cmp(b.name()))
        });

        Ok(roles.iter().map(RoleDto::from).collect())
    }
}

// GetUserPermissions

pub struct GetUserPermissionsHandler {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    permissions: Arc<dyn PermissionRepository>,
}

impl GetUserPermissionsHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
        permissions: Arc<dyn PermissionRepository>,
    ) -> Self {
        Self {
            users,
            roles,
            permissions,
        }
    }

    pub async fn handle(&self, user_id: UserId) -> Result<Vec<PermissionDto>, DomainError> {
        let user = load_user(self.users.as_ref(), user_id).await?;
        let permissions =
            effective_permissions(self.roles.as_ref(), self.permissions.as_ref(), &user).await?;

        Ok(permissions.iter().map(PermissionDto::from).collect())
    }
}

// CheckPermission

#[derive(Debug, Clone)]
pub struct CheckPermissionQuery {
    pub user_id: UserId,
    /// Requested code, `resource:action`
    pub permission: String,
}

pub struct CheckPermissionHandler {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    permissions: Arc<dyn PermissionRepository>,
}

impl CheckPermissionHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
        permissions: Arc<dyn PermissionRepository>,
    ) -> Self {
        Self {
            users,
            roles,
            permissions,
        }
    }

    /// Resolve whether the user holds the permission.
    ///
    /// Only active users are granted anything. Wildcard codes held by a role
    /// (`users:*`, `*:*`) cover the concrete code requested.
    pub async fn handle(&self, query: CheckPermissionQuery) -> Result<PermissionCheckDto, DomainError> {
        let requested = PermissionCode::parse(&query.permission)?;
        let user = load_user(self.users.as_ref(), query.user_id).await?;

        let granted_by = if user.status() == UserStatus::Active {
            effective_permissions(self.roles.as_ref(), self.permissions.as_ref(), &user)
                .await?
                .iter()
                .map(Permission::code)
                .find(|held| held.grants(&requested))
                .map(|held| held.to_string())
        } else {
            None
        };

        debug!(
            user_id = %user.id(),
            permission = %requested,
            granted = granted_by.is_some(),
            "Permission checked"
        );

        Ok(PermissionCheckDto {
            user_id: user.id().into(),
            permission: requested.to_string(),
            granted: granted_by.is_some(),
            granted_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::TestContext;
    use crate::domain::role::NewRoleParams;
    use crate::domain::user::MockUserRepository;
    use crate::domain::ErrorKind;

    #[tokio::test]
    async fn test_get_user() {
        let ctx = TestContext::new();
        let user = ctx.seed_user("get@x.com").await;

        let dto = GetUserHandler::new(ctx.users.clone())
            .handle(user.id())
            .await
            .unwrap();
        assert_eq!(dto.email, "get@x.com");

        let err = GetUserHandler::new(ctx.users.clone())
            .handle(UserId::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_users_paging_and_limits() {
        let ctx = TestContext::new();
        for i in 0..5 {
            ctx.seed_user(&format!("u{}@x.com", i)).await;
        }
        let handler = ListUsersHandler::new(ctx.users.clone());

        let page = handler
            .handle(ListUsersQuery {
                limit: Some(2),
                offset: Some(4),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.users.len(), 1);

        let all = handler
            .handle(ListUsersQuery {
                limit: Some(10_000),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(all.limit, Some(MAX_PAGE_SIZE));
        assert_eq!(all.users.len(), 5);

        let default = handler.handle(ListUsersQuery::default()).await.unwrap();
        assert_eq!(default.limit, Some(DEFAULT_PAGE_SIZE));
    }

    #[tokio::test]
    async fn test_list_users_filters() {
        let ctx = TestContext::new();
        ctx.seed_user("alice@x.com").await;
        ctx.seed_user("bob@x.com").await;

        let found = ListUsersHandler::new(ctx.users.clone())
            .handle(ListUsersQuery {
                search: Some("ALICE".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.users[0].email, "alice@x.com");

        let pending = ListUsersHandler::new(ctx.users.clone())
            .handle(ListUsersQuery {
                status: Some(UserStatus::Pending),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(pending.total, 0);
    }

    #[tokio::test]
    async fn test_list_users_infrastructure_error() {
        let mut users = MockUserRepository::new();
        users
            .expect_count()
            .returning(|_| Err(DomainError::infrastructure("db down")));

        let err = ListUsersHandler::new(Arc::new(users))
            .handle(ListUsersQuery::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert!(err.to_string().contains("count users: db down"));
    }

    #[tokio::test]
    async fn test_user_roles_sorted_by_priority() {
        let ctx = TestContext::new();
        let low = ctx.seed_role(NewRoleParams::new("low", "Low").with_priority(1)).await;
        let high = ctx.seed_role(NewRoleParams::new("high", "High").with_priority(10)).await;
        let mut user = ctx.seed_user("r@x.com").await;
        user.set_roles([low.id(), high.id()]).unwrap();
        ctx.users.update(&user).await.unwrap();

        let roles = GetUserRolesHandler::new(ctx.users.clone(), ctx.roles.clone())
            .handle(user.id())
            .await
            .unwrap();

        let names: Vec<_> = roles.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["high", "low"]);
    }

    #[tokio::test]
    async fn test_user_permissions_deduplicated() {
        let ctx = TestContext::new();
        let read = ctx.seed_permission("posts", "read").await;
        let write = ctx.seed_permission("posts", "write").await;
        let a = ctx
            .seed_role(NewRoleParams::new("a", "A").with_permissions(vec![read.id(), write.id()]))
            .await;
        let b = ctx
            .seed_role(NewRoleParams::new("b", "B").with_permissions(vec![read.id()]))
            .await;
        let mut user = ctx.seed_user("p@x.com").await;
        user.set_roles([a.id(), b.id()]).unwrap();
        ctx.users.update(&user).await.unwrap();

        let permissions = GetUserPermissionsHandler::new(
            ctx.users.clone(),
            ctx.roles.clone(),
            ctx.permissions.clone(),
        )
        .handle(user.id())
        .await
        .unwrap();

        let codes: Vec<_> = permissions.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["posts:read", "posts:write"]);
    }

    async fn user_with_codes(ctx: &TestContext, email: &str, codes: &[(&str, &str)]) -> User {
        let mut ids = Vec::new();
        for (resource, action) in codes {
            ids.push(ctx.seed_permission(resource, action).await.id());
        }
        let role = ctx
            .seed_role(NewRoleParams::new(format!("role-{}", ids.len()), "R").with_permissions(ids))
            .await;
        let mut user = ctx.seed_user(email).await;
        user.assign_role(role.id()).unwrap();
        ctx.users.update(&user).await.unwrap();
        user
    }

    fn check_handler(ctx: &TestContext) -> CheckPermissionHandler {
        CheckPermissionHandler::new(ctx.users.clone(), ctx.roles.clone(), ctx.permissions.clone())
    }

    #[tokio::test]
    async fn test_check_permission_exact_and_wildcard() {
        let ctx = TestContext::new();
        let user = user_with_codes(&ctx, "c@x.com", &[("users", "*"), ("posts", "read")]).await;
        let handler = check_handler(&ctx);

        let exact = handler
            .handle(CheckPermissionQuery {
                user_id: user.id(),
                permission: "posts:read".into(),
            })
            .await
            .unwrap();
        assert!(exact.granted);
        assert_eq!(exact.granted_by.as_deref(), Some("posts:read"));

        let wildcard = handler
            .handle(CheckPermissionQuery {
                user_id: user.id(),
                permission: "Users:Delete".into(),
            })
            .await
            .unwrap();
        assert!(wildcard.granted);
        assert_eq!(wildcard.permission, "users:delete");
        assert_eq!(wildcard.granted_by.as_deref(), Some("users:*"));

        let denied = handler
            .handle(CheckPermissionQuery {
                user_id: user.id(),
                permission: "posts:write".into(),
            })
            .await
            .unwrap();
        assert!(!denied.granted);
        assert!(denied.granted_by.is_none());
    }

    #[tokio::test]
    async fn test_check_permission_denied_for_banned_user() {
        let ctx = TestContext::new();
        let mut user = user_with_codes(&ctx, "b@x.com", &[("posts", "read")]).await;
        user.ban("abuse").unwrap();
        ctx.users.update(&user).await.unwrap();

        let result = check_handler(&ctx)
            .handle(CheckPermissionQuery {
                user_id: user.id(),
                permission: "posts:read".into(),
            })
            .await
            .unwrap();

        assert!(!result.granted);
    }

    #[tokio::test]
    async fn test_check_permission_rejects_malformed_code() {
        let ctx = TestContext::new();
        let user = ctx.seed_user("m@x.com").await;

        let err = check_handler(&ctx)
            .handle(CheckPermissionQuery {
                user_id: user.id(),
                permission: "no-colon".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
