//! Identity Core
//!
//! Accounts, roles and permissions with RBAC invariants, plus the
//! authentication and session lifecycle:
//! - User, Role and Permission aggregates with domain events
//! - Command and query handlers over repository ports
//! - Login, token refresh with rotation, logout and password reset

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod state;

pub use config::AppConfig;
pub use state::AppState;

use std::sync::Arc;

use rand::Rng;
use tracing::{info, warn};

use application::auth::AuthSettings;
use application::user::{create_account, NewAccount};
use application::EventPublisher;
use domain::user::validate_password;
use domain::{DomainError, NewRoleParams, Permission, PermissionCode, Role, UserQuery};
use infrastructure::{
    auth::{Argon2Hasher, JwtConfig, JwtTokenIssuer, TracingResetNotifier},
    event_bus::TracingEventBus,
    permission::InMemoryPermissionRepository,
    role::InMemoryRoleRepository,
    session::{InMemoryPasswordResetRepository, InMemorySessionRepository},
    user::InMemoryUserRepository,
};

/// Role holding every system permission
pub const ADMIN_ROLE: &str = "admin";
/// Role granted to every new registration
pub const DEFAULT_ROLE: &str = "user";

const INSECURE_JWT_SECRET: &str = "change-me-in-production";

/// Built-in permissions: resource, action, description
pub const SYSTEM_PERMISSIONS: &[(&str, &str, &str)] = &[
    ("users", "*", "Manage user accounts"),
    ("roles", "*", "Manage roles"),
    ("permissions", "*", "Manage permissions"),
    ("sessions", "*", "Manage sessions of any user"),
    ("profile", "read", "Read own profile"),
    ("profile", "update", "Update own profile"),
];

/// Codes held by the default role
const DEFAULT_ROLE_PERMISSIONS: &[&str] = &["profile:read", "profile:update"];

/// What [`seed_system_catalog`] created
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    pub permissions_created: usize,
    pub roles_created: usize,
}

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state, seed the system catalog and the initial admin
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let jwt_secret = if config.auth.jwt_secret.trim().is_empty() {
        warn!("No JWT secret configured, generated an ephemeral one; tokens will not survive a restart");
        generate_random_secret()
    } else {
        if config.auth.jwt_secret == INSECURE_JWT_SECRET {
            warn!("Using the built-in JWT secret; set APP__AUTH__JWT_SECRET in production");
        }
        config.auth.jwt_secret.clone()
    };

    let state = AppState {
        config: config.clone(),
        settings: AuthSettings::from(config),
        users: Arc::new(InMemoryUserRepository::new()),
        roles: Arc::new(InMemoryRoleRepository::new()),
        permissions: Arc::new(InMemoryPermissionRepository::new()),
        sessions: Arc::new(InMemorySessionRepository::new()),
        resets: Arc::new(InMemoryPasswordResetRepository::new()),
        hasher: Arc::new(Argon2Hasher::new()),
        tokens: Arc::new(JwtTokenIssuer::new(JwtConfig::new(
            jwt_secret,
            config.auth.issuer.clone(),
        ))),
        notifier: Arc::new(TracingResetNotifier),
        event_bus: Arc::new(TracingEventBus::new()),
    };

    let summary = seed_system_catalog(&state).await?;
    info!(
        permissions_created = summary.permissions_created,
        roles_created = summary.roles_created,
        "System catalog ready"
    );

    create_initial_admin_user(&state).await?;

    Ok(state)
}

/// Ensure the system permissions, the `admin` role and the default `user`
/// role exist. Running it again creates nothing.
pub async fn seed_system_catalog(state: &AppState) -> Result<CatalogSummary, DomainError> {
    let events = EventPublisher::new(state.event_bus.clone());
    let mut summary = CatalogSummary::default();
    let mut catalog = Vec::with_capacity(SYSTEM_PERMISSIONS.len());

    for (resource, action, description) in SYSTEM_PERMISSIONS {
        let code = PermissionCode::new(resource, action)?;
        let permission = match state.permissions.find_by_code(&code).await? {
            Some(existing) => existing,
            None => {
                let mut created = Permission::new_system(resource, action, *description)?;
                state.permissions.create(&created).await?;
                events.publish(created.take_events()).await;
                summary.permissions_created += 1;
                created
            }
        };
        catalog.push(permission);
    }

    let all_ids = catalog.iter().map(|p| p.id()).collect();
    let default_ids = catalog
        .iter()
        .filter(|p| DEFAULT_ROLE_PERMISSIONS.contains(&p.code().to_string().as_str()))
        .map(|p| p.id())
        .collect();

    let admin = NewRoleParams::new(ADMIN_ROLE, "Administrator")
        .with_description("Full access to identity administration")
        .with_permissions(all_ids)
        .with_priority(100)
        .as_system();
    let member = NewRoleParams::new(DEFAULT_ROLE, "User")
        .with_description("Granted to every new account")
        .with_permissions(default_ids)
        .as_default();

    for params in [admin, member] {
        if state.roles.exists_by_name(&params.name).await? {
            continue;
        }
        let mut role = Role::new(params)?;
        state.roles.create(&role).await?;
        events.publish(role.take_events()).await;
        summary.roles_created += 1;
    }

    Ok(summary)
}

fn generate_random_secret() -> String {
    use rand::distributions::Alphanumeric;

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Random password that satisfies the password policy
fn generate_random_password() -> String {
    use rand::distributions::Alphanumeric;

    loop {
        let body: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(20)
            .map(char::from)
            .collect();
        let candidate = format!("{}-{}", &body[..10], &body[10..]);

        if validate_password(&candidate).is_ok() {
            return candidate;
        }
    }
}

/// Create an initial admin user if no users exist.
///
/// Returns the email of the created account.
pub async fn create_initial_admin_user(state: &AppState) -> anyhow::Result<Option<String>> {
    if state.users.count(&UserQuery::new()).await? > 0 {
        return Ok(None);
    }

    let Some(admin_role) = state.roles.find_by_name(ADMIN_ROLE).await? else {
        anyhow::bail!("system role '{}' is missing; seed the catalog first", ADMIN_ROLE);
    };

    let bootstrap = &state.config.bootstrap;
    let (password, is_configured) = match &bootstrap.admin_password {
        Some(p) if !p.is_empty() => (p.clone(), true),
        _ => (generate_random_password(), false),
    };

    let mut user = create_account(
        state.users.as_ref(),
        state.roles.as_ref(),
        state.hasher.as_ref(),
        NewAccount {
            email: bootstrap.admin_email.clone(),
            password: password.clone(),
            full_name: bootstrap.admin_full_name.clone(),
            role_ids: vec![admin_role.id()],
            activate: true,
        },
    )
    .await?;

    EventPublisher::new(state.event_bus.clone())
        .publish(user.take_events())
        .await;

    info!("===========================================");
    info!("Initial admin user created!");
    info!("Email: {}", user.email());

    if is_configured {
        info!("Password: (set via APP__BOOTSTRAP__ADMIN_PASSWORD)");
    } else {
        info!("Password: {}", password);
    }

    info!("Please change this password after first login.");
    info!("===========================================");

    Ok(Some(user.email().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::auth::{LoginCommand, ValidateAccessTokenQuery};
    use crate::application::user::CheckPermissionQuery;
    use crate::domain::ClientInfo;

    fn config_with_password(password: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.bootstrap.admin_password = Some(password.to_string());
        config
    }

    #[test]
    fn test_generated_password_meets_policy() {
        for _ in 0..20 {
            let password = generate_random_password();
            assert!(validate_password(&password).is_ok());
            assert_eq!(password.len(), 21);
        }
    }

    #[tokio::test]
    async fn test_catalog_seed_is_idempotent() {
        let state = create_app_state_with_config(&config_with_password("Admin-Pass-1"))
            .await
            .unwrap();

        let again = seed_system_catalog(&state).await.unwrap();
        assert_eq!(again, CatalogSummary::default());

        let permissions = state.permissions.find_all().await.unwrap();
        assert_eq!(permissions.len(), SYSTEM_PERMISSIONS.len());
        assert!(permissions.iter().all(|p| p.is_system()));

        let admin = state.roles.find_by_name(ADMIN_ROLE).await.unwrap().unwrap();
        assert!(admin.is_system());
        assert_eq!(admin.permission_ids().len(), SYSTEM_PERMISSIONS.len());

        let member = state.roles.find_by_name(DEFAULT_ROLE).await.unwrap().unwrap();
        assert!(member.is_default());
        assert!(!member.is_system());
        assert_eq!(member.permission_ids().len(), 2);
    }

    #[tokio::test]
    async fn test_initial_admin_can_log_in_and_manage_users() {
        let state = create_app_state_with_config(&config_with_password("Admin-Pass-1"))
            .await
            .unwrap();

        let response = state
            .login_handler()
            .handle(LoginCommand {
                email: state.config.bootstrap.admin_email.clone(),
                password: "Admin-Pass-1".to_string(),
                client: ClientInfo::default(),
            })
            .await
            .unwrap();
        assert_eq!(response.user.status, "active");

        let principal = state
            .validate_token_handler()
            .handle(ValidateAccessTokenQuery {
                token: response.tokens.access_token,
            })
            .await
            .unwrap();

        let check = state
            .check_permission_handler()
            .handle(CheckPermissionQuery {
                user_id: principal.user_id.into(),
                permission: "users:delete".to_string(),
            })
            .await
            .unwrap();
        assert!(check.granted);
        assert_eq!(check.granted_by.as_deref(), Some("users:*"));

        assert!(create_initial_admin_user(&state).await.unwrap().is_none());
    }
}
