//! Shared application state

use std::sync::Arc;

use crate::application::auth::{
    AuthSettings, LoginHandler, RefreshTokenHandler, RegisterHandler, SessionIssuer,
    ValidateAccessTokenHandler,
};
use crate::application::user::{CheckPermissionHandler, CreateUserHandler};
use crate::config::AppConfig;
use crate::domain::{
    EventBus, PasswordHasher, PasswordResetNotifier, PasswordResetRepository,
    PermissionRepository, RoleRepository, SessionRepository, TokenIssuer, UserRepository,
};

/// Every port the handlers need, wired once at startup
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub settings: AuthSettings,
    pub users: Arc<dyn UserRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub permissions: Arc<dyn PermissionRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub resets: Arc<dyn PasswordResetRepository>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn TokenIssuer>,
    pub notifier: Arc<dyn PasswordResetNotifier>,
    pub event_bus: Arc<dyn EventBus>,
}

impl AppState {
    pub fn session_issuer(&self) -> SessionIssuer {
        SessionIssuer::new(
            self.sessions.clone(),
            self.tokens.clone(),
            self.settings.clone(),
        )
    }

    pub fn register_handler(&self) -> RegisterHandler {
        RegisterHandler::new(
            self.users.clone(),
            self.roles.clone(),
            self.hasher.clone(),
            self.session_issuer(),
        )
        .with_event_bus(self.event_bus.clone())
    }

    pub fn login_handler(&self) -> LoginHandler {
        LoginHandler::new(self.users.clone(), self.hasher.clone(), self.session_issuer())
    }

    pub fn refresh_handler(&self) -> RefreshTokenHandler {
        RefreshTokenHandler::new(self.users.clone(), self.session_issuer())
    }

    pub fn validate_token_handler(&self) -> ValidateAccessTokenHandler {
        ValidateAccessTokenHandler::new(
            self.users.clone(),
            self.sessions.clone(),
            self.tokens.clone(),
        )
    }

    pub fn create_user_handler(&self) -> CreateUserHandler {
        CreateUserHandler::new(self.users.clone(), self.roles.clone(), self.hasher.clone())
            .with_event_bus(self.event_bus.clone())
            .with_auto_activate(self.settings.auto_activate)
    }

    pub fn check_permission_handler(&self) -> CheckPermissionHandler {
        CheckPermissionHandler::new(
            self.users.clone(),
            self.roles.clone(),
            self.permissions.clone(),
        )
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
