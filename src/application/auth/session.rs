//! Session opening, rotation and limits shared by the auth flows

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info};

use crate::application::dto::AuthTokensDto;
use crate::config::AppConfig;
use crate::domain::{
    ClientInfo, DomainError, ResultExt, RevocationReason, Session, SessionRepository, TokenIssuer,
    User, UserId,
};
use crate::infrastructure::auth::generate_opaque_token;

pub const TOKEN_TYPE: &str = "Bearer";

/// Token lifetimes and account policy used by the auth handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub reset_token_ttl: Duration,
    /// 0 disables the limit
    pub max_sessions_per_user: usize,
    pub auto_activate: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(30),
            reset_token_ttl: Duration::minutes(60),
            max_sessions_per_user: 10,
            auto_activate: false,
        }
    }
}

impl From<&AppConfig> for AuthSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            access_token_ttl: Duration::minutes(config.auth.access_token_ttl_minutes),
            refresh_token_ttl: Duration::days(config.auth.refresh_token_ttl_days),
            reset_token_ttl: Duration::minutes(config.auth.reset_token_ttl_minutes),
            max_sessions_per_user: config.auth.max_sessions_per_user,
            auto_activate: config.users.auto_activate,
        }
    }
}

/// Opens sessions and signs their token pairs
#[derive(Clone)]
pub struct SessionIssuer {
    sessions: Arc<dyn SessionRepository>,
    tokens: Arc<dyn TokenIssuer>,
    settings: AuthSettings,
}

impl SessionIssuer {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        tokens: Arc<dyn TokenIssuer>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            sessions,
            tokens,
            settings,
        }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    pub fn sessions(&self) -> &Arc<dyn SessionRepository> {
        &self.sessions
    }

    pub fn tokens(&self) -> &Arc<dyn TokenIssuer> {
        &self.tokens
    }

    /// Create a session for `user` and sign its token pair.
    ///
    /// The access token is signed before the session is stored, so a signing
    /// failure leaves nothing behind.
    pub async fn open(
        &self,
        user: &User,
        client: ClientInfo,
    ) -> Result<(Session, AuthTokensDto), DomainError> {
        let refresh = generate_opaque_token();
        let session = Session::new(user.id(), refresh.hash, client, self.settings.refresh_token_ttl);
        let access = self
            .tokens
            .issue_access_token(user, &session, self.settings.access_token_ttl)?;

        self.sessions
            .create(&session)
            .await
            .context("create session")?;

        debug!(user_id = %user.id(), session_id = %session.id, "Session opened");

        let tokens = AuthTokensDto {
            access_token: access.token,
            refresh_token: refresh.raw,
            token_type: TOKEN_TYPE.to_string(),
            expires_at: access.expires_at,
            refresh_expires_at: session.expires_at,
            session_id: session.id.into(),
        };
        Ok((session, tokens))
    }

    /// Replace an already claimed session with a fresh one on the same client
    pub async fn rotate(
        &self,
        user: &User,
        mut previous: Session,
    ) -> Result<(Session, AuthTokensDto), DomainError> {
        let (next, tokens) = self.open(user, previous.client.clone()).await?;

        previous.rotate_to(next.id);
        previous.touch();
        self.sessions
            .update(&previous)
            .await
            .context("retire rotated session")?;

        Ok((next, tokens))
    }

    /// Revoke the oldest active sessions beyond the per-user limit
    pub async fn enforce_limit(&self, user_id: UserId) -> Result<usize, DomainError> {
        let max = self.settings.max_sessions_per_user;
        if max == 0 {
            return Ok(0);
        }

        let active = self
            .sessions
            .find_active_by_user(user_id)
            .await
            .context("list active sessions")?;
        let excess = active.len().saturating_sub(max);

        let mut revoked = 0;
        for session in active.iter().take(excess) {
            if self
                .sessions
                .revoke(session.id, RevocationReason::SessionLimit)
                .await
                .context("revoke session")?
            {
                revoked += 1;
            }
        }

        if revoked > 0 {
            info!(user_id = %user_id, revoked, max, "Session limit enforced");
        }
        Ok(revoked)
    }
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
