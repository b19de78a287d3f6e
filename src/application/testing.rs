//! Shared fixtures for handler tests

use std::sync::Arc;

use crate::application::auth::{AuthSettings, SessionIssuer};
use crate::application::EventPublisher;
use crate::domain::auth::PasswordHasher;
use crate::domain::role::NewRoleParams;
use crate::domain::{DomainError, Email, Permission, PermissionRepository, Role, RoleRepository, User, UserRepository};
use crate::infrastructure::auth::{InMemoryResetNotifier, JwtConfig, JwtTokenIssuer};
use crate::infrastructure::event_bus::InMemoryEventBus;
use crate::infrastructure::permission::InMemoryPermissionRepository;
use crate::infrastructure::role::InMemoryRoleRepository;
use crate::infrastructure::session::{InMemoryPasswordResetRepository, InMemorySessionRepository};
use crate::infrastructure::user::InMemoryUserRepository;

/// Reversible stand-in for Argon2 so tests stay fast
#[derive(Debug, Default)]
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> Result<String, DomainError> {
        Ok(format!("plain:{}", password))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, DomainError> {
        Ok(hash == format!("plain:{}", password))
    }
}

pub const PASSWORD: &str = "Secure123!";

/// In-memory adapters wired together
pub struct TestContext {
    pub users: Arc<InMemoryUserRepository>,
    pub roles: Arc<InMemoryRoleRepository>,
    pub permissions: Arc<InMemoryPermissionRepository>,
    pub sessions: Arc<InMemorySessionRepository>,
    pub resets: Arc<InMemoryPasswordResetRepository>,
    pub bus: Arc<InMemoryEventBus>,
    pub hasher: Arc<PlainHasher>,
    pub tokens: Arc<JwtTokenIssuer>,
    pub notifier: Arc<InMemoryResetNotifier>,
    pub settings: AuthSettings,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            roles: Arc::new(InMemoryRoleRepository::new()),
            permissions: Arc::new(InMemoryPermissionRepository::new()),
            sessions: Arc::new(InMemorySessionRepository::new()),
            resets: Arc::new(InMemoryPasswordResetRepository::new()),
            bus: Arc::new(InMemoryEventBus::new()),
            hasher: Arc::new(PlainHasher),
            tokens: Arc::new(JwtTokenIssuer::new(JwtConfig::new("test-secret", "identity-test"))),
            notifier: Arc::new(InMemoryResetNotifier::new()),
            settings: AuthSettings::default(),
        }
    }

    pub fn publisher(&self) -> EventPublisher {
        EventPublisher::new(self.bus.clone())
    }

    pub fn session_issuer(&self) -> SessionIssuer {
        SessionIssuer::new(self.sessions.clone(), self.tokens.clone(), self.settings.clone())
    }

    /// Persist an active user with [`PASSWORD`]
    pub async fn seed_user(&self, email: &str) -> User {
        let mut user = User::new(
            Email::parse(email).unwrap(),
            self.hasher.hash(PASSWORD).unwrap(),
            "Seeded User",
        )
        .unwrap();
        user.activate().unwrap();
        user.clear_events();
        self.users.create(&user).await.unwrap();
        user
    }

    pub async fn seed_role(&self, params: NewRoleParams) -> Role {
        let mut role = Role::new(params).unwrap();
        role.clear_events();
        self.roles.create(&role).await.unwrap();
        role
    }

    pub async fn seed_permission(&self, resource: &str, action: &str) -> Permission {
        let mut permission = Permission::new(resource, action, "").unwrap();
        permission.clear_events();
        self.permissions.create(&permission).await.unwrap();
        permission
    }

    pub async fn reload_user(&self, user: &User) -> User {
        self.users.find_by_id(user.id()).await.unwrap().unwrap()
    }

    pub async fn reload_role(&self, role: &Role) -> Option<Role> {
        self.roles.find_by_id(role.id()).await.unwrap()
    }
}
