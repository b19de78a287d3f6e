//! User command handlers

use std::sync::Arc;

use tracing::{info, warn};

use super::account::{create_account, ensure_roles_exist, NewAccount};
use crate::application::dto::UserDto;
use crate::application::EventPublisher;
use crate::domain::auth::PasswordHasher;
use crate::domain::user::validate_password;
use crate::domain::{
    AuthFailure, DomainError, EventBus, ResultExt, RevocationReason, RoleId, RoleRepository,
    SessionId, SessionRepository, User, UserId, UserRepository,
};
use crate::infrastructure::observability::{record_auth_result, AuthFlow};

async fn load_user(users: &dyn UserRepository, user_id: UserId) -> Result<User, DomainError> {
    users
        .find_by_id(user_id)
        .await
        .context("load user")?
        .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", user_id)))
}

/// Persist, publish and map a mutated user
async fn commit(
    users: &dyn UserRepository,
    events: &EventPublisher,
    mut user: User,
) -> Result<UserDto, DomainError> {
    users.update(&user).await.context("save user")?;
    events.publish(user.take_events()).await;
    Ok(UserDto::from(&user))
}

// CreateUser

#[derive(Debug, Clone)]
pub struct CreateUserCommand {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role_ids: Vec<RoleId>,
    /// Activate immediately instead of leaving the account pending
    pub activate: bool,
}

pub struct CreateUserHandler {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    hasher: Arc<dyn PasswordHasher>,
    events: EventPublisher,
    auto_activate: bool,
}

impl CreateUserHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            users,
            roles,
            hasher,
            events: EventPublisher::none(),
            auto_activate: false,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    /// Activate every created account regardless of the command flag
    pub fn with_auto_activate(mut self, auto_activate: bool) -> Self {
        self.auto_activate = auto_activate;
        self
    }

    pub async fn handle(&self, cmd: CreateUserCommand) -> Result<UserDto, DomainError> {
        let account = NewAccount {
            email: cmd.email,
            password: cmd.password,
            full_name: cmd.full_name,
            role_ids: cmd.role_ids,
            activate: cmd.activate || self.auto_activate,
        };

        let mut user = create_account(
            self.users.as_ref(),
            self.roles.as_ref(),
            self.hasher.as_ref(),
            account,
        )
        .await?;

        info!(user_id = %user.id(), email = %user.email(), status = %user.status(), "User created");

        self.events.publish(user.take_events()).await;
        Ok(UserDto::from(&user))
    }
}

// UpdateProfile

#[derive(Debug, Clone)]
pub struct UpdateProfileCommand {
    pub user_id: UserId,
    pub full_name: String,
}

pub struct UpdateProfileHandler {
    users: Arc<dyn UserRepository>,
    events: EventPublisher,
}

impl UpdateProfileHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self {
            users,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    pub async fn handle(&self, cmd: UpdateProfileCommand) -> Result<UserDto, DomainError> {
        let mut user = load_user(self.users.as_ref(), cmd.user_id).await?;
        user.update_profile(cmd.full_name)?;

        info!(user_id = %user.id(), "User profile updated");
        commit(self.users.as_ref(), &self.events, user).await
    }
}

// ChangePassword

#[derive(Debug, Clone)]
pub struct ChangePasswordCommand {
    pub user_id: UserId,
    pub current_password: String,
    pub new_password: String,
    /// Session the request came from; it survives the change
    pub current_session: Option<SessionId>,
}

pub struct ChangePasswordHandler {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    hasher: Arc<dyn PasswordHasher>,
    events: EventPublisher,
}

impl ChangePasswordHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            users,
            sessions,
            hasher,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    pub async fn handle(&self, cmd: ChangePasswordCommand) -> Result<UserDto, DomainError> {
        let result = self.change(cmd).await;
        record_auth_result(AuthFlow::ChangePassword, &result);
        result
    }

    async fn change(&self, cmd: ChangePasswordCommand) -> Result<UserDto, DomainError> {
        let mut user = load_user(self.users.as_ref(), cmd.user_id).await?;

        if !self.hasher.verify(&cmd.current_password, user.password_hash())? {
            warn!(user_id = %user.id(), "Password change rejected: current password mismatch");
            return Err(AuthFailure::InvalidCredentials.into());
        }

        validate_password(&cmd.new_password)?;
        let new_hash = self.hasher.hash(&cmd.new_password)?;
        user.change_password(new_hash)?;

        self.users.update(&user).await.context("save user")?;

        let revoked = self
            .sessions
            .revoke_all_for_user(user.id(), RevocationReason::PasswordChanged, cmd.current_session)
            .await
            .context("revoke sessions")?;

        info!(user_id = %user.id(), revoked_sessions = revoked, "User password changed");

        self.events.publish(user.take_events()).await;
        Ok(UserDto::from(&user))
    }
}

// Activate / Deactivate / Ban

#[derive(Debug, Clone)]
pub struct ActivateUserCommand {
    pub user_id: UserId,
}

pub struct ActivateUserHandler {
    users: Arc<dyn UserRepository>,
    events: EventPublisher,
}

impl ActivateUserHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self {
            users,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    pub async fn handle(&self, cmd: ActivateUserCommand) -> Result<UserDto, DomainError> {
        let mut user = load_user(self.users.as_ref(), cmd.user_id).await?;
        user.activate()?;

        info!(user_id = %user.id(), "User activated");
        commit(self.users.as_ref(), &self.events, user).await
    }
}

#[derive(Debug, Clone)]
pub struct DeactivateUserCommand {
    pub user_id: UserId,
}

pub struct DeactivateUserHandler {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    events: EventPublisher,
}

impl DeactivateUserHandler {
    pub fn new(users: Arc<dyn UserRepository>, sessions: Arc<dyn SessionRepository>) -> Self {
        Self {
            users,
            sessions,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    pub async fn handle(&self, cmd: DeactivateUserCommand) -> Result<UserDto, DomainError> {
        let mut user = load_user(self.users.as_ref(), cmd.user_id).await?;
        user.deactivate()?;

        self.users.update(&user).await.context("save user")?;
        let revoked = self
            .sessions
            .revoke_all_for_user(user.id(), RevocationReason::AccountDisabled, None)
            .await
            .context("revoke sessions")?;

        info!(user_id = %user.id(), revoked_sessions = revoked, "User deactivated");

        self.events.publish(user.take_events()).await;
        Ok(UserDto::from(&user))
    }
}

#[derive(Debug, Clone)]
pub struct BanUserCommand {
    pub user_id: UserId,
    pub reason: String,
}

pub struct BanUserHandler {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    events: EventPublisher,
}

impl BanUserHandler {
    pub fn new(users: Arc<dyn UserRepository>, sessions: Arc<dyn SessionRepository>) -> Self {
        Self {
            users,
            sessions,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    pub async fn handle(&self, cmd: BanUserCommand) -> Result<UserDto, DomainError> {
        let mut user = load_user(self.users.as_ref(), cmd.user_id).await?;
        user.ban(cmd.reason)?;

        self.users.update(&user).await.context("save user")?;
        let revoked = self
            .sessions
            .revoke_all_for_user(user.id(), RevocationReason::AccountDisabled, None)
            .await
            .context("revoke sessions")?;

        info!(user_id = %user.id(), revoked_sessions = revoked, "User banned");

        self.events.publish(user.take_events()).await;
        Ok(UserDto::from(&user))
    }
}

// Role assignment

#[derive(Debug, Clone)]
pub struct AssignRoleCommand {
    pub user_id: UserId,
    pub role_id: RoleId,
}

pub struct AssignRoleHandler {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    events: EventPublisher,
}

impl AssignRoleHandler {
    pub fn new(users: Arc<dyn UserRepository>, roles: Arc<dyn RoleRepository>) -> Self {
        Self {
            users,
            roles,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    pub async fn handle(&self, cmd: AssignRoleCommand) -> Result<UserDto, DomainError> {
        let mut user = load_user(self.users.as_ref(), cmd.user_id).await?;

        if self
            .roles
            .find_by_id(cmd.role_id)
            .await
            .context("load role")?
            .is_none()
        {
            return Err(DomainError::not_found(format!(
                "Role '{}' not found",
                cmd.role_id
            )));
        }

        user.assign_role(cmd.role_id)?;

        info!(user_id = %user.id(), role_id = %cmd.role_id, "Role assigned to user");
        commit(self.users.as_ref(), &self.events, user).await
    }
}

#[derive(Debug, Clone)]
pub struct RevokeRoleCommand {
    pub user_id: UserId,
    pub role_id: RoleId,
}

pub struct RevokeRoleHandler {
    users: Arc<dyn UserRepository>,
    events: EventPublisher,
}

impl RevokeRoleHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self {
            users,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    pub async fn handle(&self, cmd: RevokeRoleCommand) -> Result<UserDto, DomainError> {
        let mut user = load_user(self.users.as_ref(), cmd.user_id).await?;
        user.revoke_role(cmd.role_id)?;

        info!(user_id = %user.id(), role_id = %cmd.role_id, "Role revoked from user");
        commit(self.users.as_ref(), &self.events, user).await
    }
}

#[derive(Debug, Clone)]
pub struct SetUserRolesCommand {
    pub user_id: UserId,
    pub role_ids: Vec<RoleId>,
}

pub struct SetUserRolesHandler {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    events: EventPublisher,
}

impl SetUserRolesHandler {
    pub fn new(users: Arc<dyn UserRepository>, roles: Arc<dyn RoleRepository>) -> Self {
        Self {
            users,
            roles,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    pub async fn handle(&self, cmd: SetUserRolesCommand) -> Result<UserDto, DomainError> {
        let mut user = load_user(self.users.as_ref(), cmd.user_id).await?;
        ensure_roles_exist(self.roles.as_ref(), &cmd.role_ids).await?;

        if !user.set_roles(cmd.role_ids)? {
            return Ok(UserDto::from(&user));
        }

        info!(user_id = %user.id(), roles = user.role_ids().len(), "User roles replaced");
        commit(self.users.as_ref(), &self.events, user).await
    }
}

// DeleteUser

#[derive(Debug, Clone)]
pub struct DeleteUserCommand {
    pub user_id: UserId,
}

pub struct DeleteUserHandler {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    events: EventPublisher,
}

impl DeleteUserHandler {
    pub fn new(users: Arc<dyn UserRepository>, sessions: Arc<dyn SessionRepository>) -> Self {
        Self {
            users,
            sessions,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    pub async fn handle(&self, cmd: DeleteUserCommand) -> Result<(), DomainError> {
        let mut user = load_user(self.users.as_ref(), cmd.user_id).await?;
        user.delete()?;

        if !self.users.delete(user.id()).await.context("delete user")? {
            return Err(DomainError::not_found(format!(
                "User '{}' not found",
                user.id()
            )));
        }

        let revoked = self
            .sessions
            .revoke_all_for_user(user.id(), RevocationReason::AccountDisabled, None)
            .await
            .context("revoke sessions")?;

        info!(user_id = %user.id(), revoked_sessions = revoked, "User deleted");

        self.events.publish(user.take_events()).await;
        Ok(())
    }
}
