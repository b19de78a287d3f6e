//! Authentication command handlers

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::session::SessionIssuer;
use crate::application::dto::{AuthResponseDto, AuthTokensDto, CountDto, MessageDto, UserDto};
use crate::application::user::{create_account, NewAccount};
use crate::application::EventPublisher;
use crate::domain::auth::PasswordHasher;
use crate::domain::user::validate_password;
use crate::domain::{
    AuthFailure, ClientInfo, DomainError, Email, EventBus, PasswordResetNotifier,
    PasswordResetRepository, PasswordResetToken, ResultExt, RevocationReason, RoleRepository,
    SessionId, SessionRepository, UserId, UserRepository,
};
use crate::infrastructure::auth::{generate_opaque_token, hash_token};
use crate::infrastructure::observability::{record_auth_result, AuthFlow};

/// Returned by ForgotPassword whether or not the account exists
pub const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent";

// Register

#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub client: ClientInfo,
}

pub struct RegisterHandler {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    hasher: Arc<dyn PasswordHasher>,
    issuer: SessionIssuer,
    events: EventPublisher,
}

impl RegisterHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
        hasher: Arc<dyn PasswordHasher>,
        issuer: SessionIssuer,
    ) -> Self {
        Self {
            users,
            roles,
            hasher,
            issuer,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    pub async fn handle(&self, cmd: RegisterCommand) -> Result<AuthResponseDto, DomainError> {
        let result = self.register(cmd).await;
        record_auth_result(AuthFlow::Register, &result);
        result
    }

    /// The account is committed before the session is opened. If opening the
    /// session fails the account stays registered and the caller signs in
    /// through Login.
    async fn register(&self, cmd: RegisterCommand) -> Result<AuthResponseDto, DomainError> {
        let default_roles = self
            .roles
            .find_defaults()
            .await
            .context("load default roles")?;

        let account = NewAccount {
            email: cmd.email,
            password: cmd.password,
            full_name: cmd.full_name,
            role_ids: default_roles.iter().map(|r| r.id()).collect(),
            activate: self.issuer.settings().auto_activate,
        };

        let mut user = create_account(
            self.users.as_ref(),
            self.roles.as_ref(),
            self.hasher.as_ref(),
            account,
        )
        .await?;

        self.events.publish(user.take_events()).await;
        info!(user_id = %user.id(), roles = user.role_ids().len(), "User registered");

        let (session, tokens) = self.issuer.open(&user, cmd.client).await?;
        info!(user_id = %user.id(), session_id = %session.id, "Registration session opened");

        Ok(AuthResponseDto {
            user: UserDto::from(&user),
            tokens,
        })
    }
}

// Login

#[derive(Debug, Clone)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
    pub client: ClientInfo,
}

pub struct LoginHandler {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    issuer: SessionIssuer,
}

impl LoginHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        issuer: SessionIssuer,
    ) -> Self {
        Self {
            users,
            hasher,
            issuer,
        }
    }

    pub async fn handle(&self, cmd: LoginCommand) -> Result<AuthResponseDto, DomainError> {
        let result = self.login(cmd).await;
        record_auth_result(AuthFlow::Login, &result);
        result
    }

    /// Unknown email, malformed email and wrong password are indistinguishable
    /// to the caller. Account status is only revealed after the password matched.
    async fn login(&self, cmd: LoginCommand) -> Result<AuthResponseDto, DomainError> {
        let Ok(email) = Email::parse(&cmd.email) else {
            return Err(AuthFailure::InvalidCredentials.into());
        };

        let Some(mut user) = self
            .users
            .find_by_email(&email)
            .await
            .context("find user by email")?
        else {
            warn!(email = %email, "Login failed: unknown email");
            return Err(AuthFailure::InvalidCredentials.into());
        };

        if !self.hasher.verify(&cmd.password, user.password_hash())? {
            warn!(user_id = %user.id(), "Login failed: wrong password");
            return Err(AuthFailure::InvalidCredentials.into());
        }

        if let Err(failure) = user.ensure_can_login() {
            warn!(user_id = %user.id(), status = %user.status(), reason = %failure, "Login refused");
            return Err(failure.into());
        }

        user.record_login();
        self.users.update(&user).await.context("record login")?;

        let (session, tokens) = self.issuer.open(&user, cmd.client).await?;
        self.issuer.enforce_limit(user.id()).await?;

        info!(user_id = %user.id(), session_id = %session.id, "User logged in");

        Ok(AuthResponseDto {
            user: UserDto::from(&user),
            tokens,
        })
    }
}

// RefreshToken

#[derive(Debug, Clone)]
pub struct RefreshTokenCommand {
    pub refresh_token: String,
}

pub struct RefreshTokenHandler {
    users: Arc<dyn UserRepository>,
    issuer: SessionIssuer,
}

impl RefreshTokenHandler {
    pub fn new(users: Arc<dyn UserRepository>, issuer: SessionIssuer) -> Self {
        Self { users, issuer }
    }

    pub async fn handle(&self, cmd: RefreshTokenCommand) -> Result<AuthTokensDto, DomainError> {
        let result = self.refresh(cmd).await;
        record_auth_result(AuthFlow::Refresh, &result);
        result
    }

    async fn refresh(&self, cmd: RefreshTokenCommand) -> Result<AuthTokensDto, DomainError> {
        let sessions = self.issuer.sessions();
        let digest = hash_token(cmd.refresh_token.trim());

        let Some(session) = sessions
            .find_by_refresh_token_hash(&digest)
            .await
            .context("find session")?
        else {
            return Err(AuthFailure::TokenInvalid.into());
        };

        if session.was_rotated() {
            return Err(self.reuse_detected(session.user_id, session.id).await);
        }
        if session.is_revoked() {
            return Err(AuthFailure::TokenRevoked.into());
        }
        if session.is_expired() {
            return Err(AuthFailure::TokenExpired.into());
        }

        let user = self
            .users
            .find_by_id(session.user_id)
            .await
            .context("load user")?
            .ok_or(AuthFailure::TokenInvalid)?;
        user.ensure_can_login()?;

        // Claim the session; losing this race means the token was presented twice.
        if !sessions
            .revoke(session.id, RevocationReason::Rotated)
            .await
            .context("claim session")?
        {
            return Err(self.reuse_detected(session.user_id, session.id).await);
        }

        let previous_id = session.id;
        let (next, tokens) = self.issuer.rotate(&user, session).await?;

        info!(user_id = %user.id(), previous = %previous_id, session_id = %next.id, "Session rotated");
        Ok(tokens)
    }

    /// Revoke the whole family and report the reuse
    async fn reuse_detected(&self, user_id: UserId, session_id: SessionId) -> DomainError {
        warn!(user_id = %user_id, session_id = %session_id, "Refresh token reuse detected");

        if let Err(e) = self
            .issuer
            .sessions()
            .revoke_all_for_user(user_id, RevocationReason::ReuseDetected, None)
            .await
        {
            warn!(user_id = %user_id, error = %e, "Failed to revoke sessions after token reuse");
        }

        AuthFailure::TokenReused.into()
    }
}

// Logout

#[derive(Debug, Clone)]
pub struct LogoutCommand {
    pub user_id: UserId,
    pub session_id: SessionId,
    /// Revoke every session of the user instead of just this one
    pub logout_all: bool,
}

pub struct LogoutHandler {
    sessions: Arc<dyn SessionRepository>,
}

impl LogoutHandler {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }

    pub async fn handle(&self, cmd: LogoutCommand) -> Result<CountDto, DomainError> {
        let result = self.logout(cmd).await;
        record_auth_result(AuthFlow::Logout, &result);
        result
    }

    async fn logout(&self, cmd: LogoutCommand) -> Result<CountDto, DomainError> {
        if cmd.logout_all {
            let count = self
                .sessions
                .revoke_all_for_user(cmd.user_id, RevocationReason::LogoutAll, None)
                .await
                .context("revoke sessions")?;

            info!(user_id = %cmd.user_id, count, "User logged out everywhere");
            return Ok(CountDto { count });
        }

        let owned = self
            .sessions
            .find_by_id(cmd.session_id)
            .await
            .context("load session")?
            .filter(|s| s.user_id == cmd.user_id);
        if owned.is_none() {
            return Err(DomainError::not_found(format!(
                "Session '{}' not found",
                cmd.session_id
            )));
        }

        let revoked = self
            .sessions
            .revoke(cmd.session_id, RevocationReason::Logout)
            .await
            .context("revoke session")?;

        info!(user_id = %cmd.user_id, session_id = %cmd.session_id, "User logged out");
        Ok(CountDto {
            count: usize::from(revoked),
        })
    }
}

// ForgotPassword

#[derive(Debug, Clone)]
pub struct ForgotPasswordCommand {
    pub email: String,
}

pub struct ForgotPasswordHandler {
    users: Arc<dyn UserRepository>,
    resets: Arc<dyn PasswordResetRepository>,
    notifier: Arc<dyn PasswordResetNotifier>,
    reset_token_ttl: chrono::Duration,
}

impl ForgotPasswordHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        resets: Arc<dyn PasswordResetRepository>,
        notifier: Arc<dyn PasswordResetNotifier>,
        reset_token_ttl: chrono::Duration,
    ) -> Self {
        Self {
            users,
            resets,
            notifier,
            reset_token_ttl,
        }
    }

    /// Always answers with the same message; failures are only logged
    pub async fn handle(&self, cmd: ForgotPasswordCommand) -> MessageDto {
        let result = self.issue(cmd).await;
        record_auth_result(AuthFlow::ForgotPassword, &result);

        if let Err(e) = result {
            warn!(error = %e, "Password reset request failed");
        }
        MessageDto::new(RESET_REQUESTED_MESSAGE)
    }

    async fn issue(&self, cmd: ForgotPasswordCommand) -> Result<(), DomainError> {
        let Ok(email) = Email::parse(&cmd.email) else {
            return Ok(());
        };

        let Some(user) = self
            .users
            .find_by_email(&email)
            .await
            .context("find user by email")?
        else {
            info!(email = %email, "Password reset requested for unknown email");
            return Ok(());
        };

        if user.ensure_can_login().is_err() {
            info!(user_id = %user.id(), status = %user.status(), "Password reset refused for account");
            return Ok(());
        }

        self.resets
            .invalidate_all_for_user(user.id())
            .await
            .context("invalidate reset tokens")?;

        let token = generate_opaque_token();
        let grant = PasswordResetToken::new(user.id(), token.hash, self.reset_token_ttl);
        self.resets
            .create(&grant)
            .await
            .context("store reset token")?;

        self.notifier
            .send_reset_token(user.email(), &token.raw, grant.expires_at)
            .await
            .context("deliver reset token")?;

        info!(user_id = %user.id(), expires_at = %grant.expires_at, "Password reset token issued");
        Ok(())
    }
}

// ResetPassword

#[derive(Debug, Clone)]
pub struct ResetPasswordCommand {
    pub token: String,
    pub new_password: String,
}

pub struct ResetPasswordHandler {
    users: Arc<dyn UserRepository>,
    resets: Arc<dyn PasswordResetRepository>,
    sessions: Arc<dyn SessionRepository>,
    hasher: Arc<dyn PasswordHasher>,
    events: EventPublisher,
}

impl ResetPasswordHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        resets: Arc<dyn PasswordResetRepository>,
        sessions: Arc<dyn SessionRepository>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            users,
            resets,
            sessions,
            hasher,
            events: EventPublisher::none(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = EventPublisher::new(bus);
        self
    }

    pub async fn handle(&self, cmd: ResetPasswordCommand) -> Result<MessageDto, DomainError> {
        let result = self.reset(cmd).await;
        record_auth_result(AuthFlow::ResetPassword, &result);
        result
    }

    async fn reset(&self, cmd: ResetPasswordCommand) -> Result<MessageDto, DomainError> {
        let digest = hash_token(cmd.token.trim());
        let Some(grant) = self
            .resets
            .find_by_token_hash(&digest)
            .await
            .context("find reset token")?
        else {
            return Err(AuthFailure::TokenInvalid.into());
        };

        if grant.is_used() {
            return Err(AuthFailure::TokenInvalid.into());
        }
        if grant.is_expired() {
            return Err(AuthFailure::TokenExpired.into());
        }

        validate_password(&cmd.new_password)?;

        if !self
            .resets
            .consume(grant.id)
            .await
            .context("consume reset token")?
        {
            warn!(user_id = %grant.user_id, "Password reset token redeemed concurrently");
            return Err(AuthFailure::TokenInvalid.into());
        }

        let mut user = self
            .users
            .find_by_id(grant.user_id)
            .await
            .context("load user")?
            .ok_or(AuthFailure::TokenInvalid)?;

        let new_hash = self.hasher.hash(&cmd.new_password)?;
        user.change_password(new_hash)?;
        self.users.update(&user).await.context("save user")?;

        if let Err(e) = self.resets.invalidate_all_for_user(user.id()).await {
            warn!(user_id = %user.id(), error = %e, "Failed to invalidate outstanding reset tokens");
        }

        let revoked = self
            .sessions
            .revoke_all_for_user(user.id(), RevocationReason::PasswordChanged, None)
            .await
            .context("revoke sessions")?;

        info!(user_id = %user.id(), revoked_sessions = revoked, "Password reset completed");

        self.events.publish(user.take_events()).await;
        Ok(MessageDto::new("Password has been reset"))
    }
}

// RevokeSession

#[derive(Debug, Clone)]
pub struct RevokeSessionCommand {
    /// The caller; only their own sessions can be revoked
    pub user_id: UserId,
    pub session_id: SessionId,
}

pub struct RevokeSessionHandler {
    sessions: Arc<dyn SessionRepository>,
}

impl RevokeSessionHandler {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }

    pub async fn handle(&self, cmd: RevokeSessionCommand) -> Result<(), DomainError> {
        let owned = self
            .sessions
            .find_by_id(cmd.session_id)
            .await
            .context("load session")?
            .filter(|s| s.user_id == cmd.user_id);

        if owned.is_none() {
            warn!(user_id = %cmd.user_id, session_id = %cmd.session_id, "Revocation of foreign or unknown session refused");
            return Err(DomainError::not_found(format!(
                "Session '{}' not found",
                cmd.session_id
            )));
        }

        self.sessions
            .revoke(cmd.session_id, RevocationReason::RevokedByUser)
            .await
            .context("revoke session")?;

        info!(user_id = %cmd.user_id, session_id = %cmd.session_id, "Session revoked");
        Ok(())
    }
}

// PurgeExpiredSessions

pub struct PurgeExpiredSessionsHandler {
    sessions: Arc<dyn SessionRepository>,
}

impl PurgeExpiredSessionsHandler {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }

    pub async fn handle(&self) -> Result<CountDto, DomainError> {
        let count = self
            .sessions
            .delete_expired(Utc::now())
            .await
            .context("purge expired sessions")?;

        if count > 0 {
            info!(count, "Expired sessions purged");
        }
        Ok(CountDto { count })
    }
}
