//! Authentication query handlers

use std::sync::Arc;

use tracing::debug;

use crate::application::dto::{PrincipalDto, SessionDto};
use crate::domain::{
    AuthFailure, DomainError, ResultExt, SessionId, SessionRepository, TokenIssuer, UserId,
    UserRepository,
};
use crate::infrastructure::observability::{record_auth_result, AuthFlow};

#[derive(Debug, Clone)]
pub struct GetUserSessionsQuery {
    pub user_id: UserId,
    /// Session making the request, flagged as `current` in the result
    pub current_session: Option<SessionId>,
}

pub struct GetUserSessionsHandler {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
}

impl GetUserSessionsHandler {
    pub fn new(users: Arc<dyn UserRepository>, sessions: Arc<dyn SessionRepository>) -> Self {
        Self { users, sessions }
    }

    /// Active sessions, newest first
    pub async fn handle(&self, query: GetUserSessionsQuery) -> Result<Vec<SessionDto>, DomainError> {
        if self
            .users
            .find_by_id(query.user_id)
            .await
            .context("load user")?
            .is_none()
        {
            return Err(DomainError::not_found(format!(
                "User '{}' not found",
                query.user_id
            )));
        }

        let mut sessions = self
            .sessions
            .find_active_by_user(query.user_id)
            .await
            .context("list sessions")?;
        sessions.reverse();

        Ok(sessions
            .iter()
            .map(|s| SessionDto::from_session(s, query.current_session))
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct ValidateAccessTokenQuery {
    pub token: String,
}

pub struct ValidateAccessTokenHandler {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    tokens: Arc<dyn TokenIssuer>,
}

impl ValidateAccessTokenHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            users,
            sessions,
            tokens,
        }
    }

    pub async fn handle(&self, query: ValidateAccessTokenQuery) -> Result<PrincipalDto, DomainError> {
        let result = self.validate(query).await;
        record_auth_result(AuthFlow::ValidateToken, &result);
        result
    }

    /// A signature check alone is not enough: the session behind the token
    /// must still be live and the account must still be allowed in.
    async fn validate(&self, query: ValidateAccessTokenQuery) -> Result<PrincipalDto, DomainError> {
        let claims = self.tokens.decode_access_token(query.token.trim())?;

        let user_id = claims.user_id().map_err(|_| AuthFailure::TokenInvalid)?;
        let session_id = claims.session_id().map_err(|_| AuthFailure::TokenInvalid)?;

        let session = self
            .sessions
            .find_by_id(session_id)
            .await
            .context("load session")?
            .filter(|s| s.user_id == user_id)
            .ok_or(AuthFailure::TokenInvalid)?;
        if session.is_revoked() {
            return Err(AuthFailure::TokenRevoked.into());
        }
        if session.is_expired() {
            return Err(AuthFailure::TokenExpired.into());
        }

        let user = self
            .users
            .find_by_id(user_id)
            .await
            .context("load user")?
            .ok_or(AuthFailure::TokenInvalid)?;
        user.ensure_can_login()?;

        debug!(user_id = %user_id, session_id = %session_id, "Access token validated");

        Ok(PrincipalDto {
            user_id: user_id.into(),
            session_id: session_id.into(),
            email: user.email().to_string(),
            role_ids: user.role_ids().iter().map(|id| (*id).into()).collect(),
            expires_at: claims.expires_at(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::auth::{LoginCommand, LoginHandler};
    use crate::application::testing::{TestContext, PASSWORD};
    use crate::domain::auth::MockTokenIssuer;
    use crate::domain::{AccessClaims, ClientInfo, ErrorKind, RevocationReason};

    async fn login(ctx: &TestContext, email: &str) -> crate::application::dto::AuthResponseDto {
        LoginHandler::new(ctx.users.clone(), ctx.hasher.clone(), ctx.session_issuer())
            .handle(LoginCommand {
                email: email.to_string(),
                password: PASSWORD.to_string(),
                client: ClientInfo::default(),
            })
            .await
            .unwrap()
    }

    fn validator(ctx: &TestContext) -> ValidateAccessTokenHandler {
        ValidateAccessTokenHandler::new(ctx.users.clone(), ctx.sessions.clone(), ctx.tokens.clone())
    }

    #[tokio::test]
    async fn test_user_sessions_marks_current() {
        let ctx = TestContext::new();
        let user = ctx.seed_user("s@x.com").await;
        let first = login(&ctx, "s@x.com").await;
        login(&ctx, "s@x.com").await;

        let sessions = GetUserSessionsHandler::new(ctx.users.clone(), ctx.sessions.clone())
            .handle(GetUserSessionsQuery {
                user_id: user.id(),
                current_session: Some(first.tokens.session_id.into()),
            })
            .await
            .unwrap();

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions.iter().filter(|s| s.current).count(), 1);
    }

    #[tokio::test]
    async fn test_user_sessions_unknown_user() {
        let ctx = TestContext::new();
        let err = GetUserSessionsHandler::new(ctx.users.clone(), ctx.sessions.clone())
            .handle(GetUserSessionsQuery {
                user_id: UserId::new(),
                current_session: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_validate_live_token() {
        let ctx = TestContext::new();
        let user = ctx.seed_user("v@x.com").await;
        let response = login(&ctx, "v@x.com").await;

        let principal = validator(&ctx)
            .handle(ValidateAccessTokenQuery {
                token: response.tokens.access_token,
            })
            .await
            .unwrap();

        assert_eq!(principal.user_id, *user.id().as_uuid());
        assert_eq!(principal.session_id, response.tokens.session_id);
        assert_eq!(principal.email, "v@x.com");
    }

    #[tokio::test]
    async fn test_validate_revoked_session() {
        let ctx = TestContext::new();
        ctx.seed_user("r@x.com").await;
        let response = login(&ctx, "r@x.com").await;
        ctx.sessions
            .revoke(response.tokens.session_id.into(), RevocationReason::Logout)
            .await
            .unwrap();

        let err = validator(&ctx)
            .handle(ValidateAccessTokenQuery {
                token: response.tokens.access_token,
            })
            .await
            .unwrap_err();

        assert_eq!(err.auth_failure(), Some(AuthFailure::TokenRevoked));
    }

    #[tokio::test]
    async fn test_validate_banned_user() {
        let ctx = TestContext::new();
        let mut user = ctx.seed_user("b@x.com").await;
        let response = login(&ctx, "b@x.com").await;
        user.ban("abuse").unwrap();
        ctx.users.update(&user).await.unwrap();

        let err = validator(&ctx)
            .handle(ValidateAccessTokenQuery {
                token: response.tokens.access_token,
            })
            .await
            .unwrap_err();

        assert_eq!(err.auth_failure(), Some(AuthFailure::AccountBanned));
    }

    #[tokio::test]
    async fn test_validate_garbage_token() {
        let ctx = TestContext::new();
        let err = validator(&ctx)
            .handle(ValidateAccessTokenQuery {
                token: "not.a.jwt".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.auth_failure(), Some(AuthFailure::TokenInvalid));
    }

    #[tokio::test]
    async fn test_validate_session_of_other_user() {
        let ctx = TestContext::new();
        ctx.seed_user("a@x.com").await;
        let response = login(&ctx, "a@x.com").await;
        let session_id = response.tokens.session_id.to_string();

        let mut tokens = MockTokenIssuer::new();
        tokens.expect_decode_access_token().returning(move |_| {
            Ok(AccessClaims {
                sub: UserId::new().to_string(),
                jti: session_id.clone(),
                email: "a@x.com".into(),
                roles: Vec::new(),
                iss: "identity-test".into(),
                iat: 0,
                exp: i64::MAX / 2,
            })
        });

        let err = ValidateAccessTokenHandler::new(ctx.users.clone(), ctx.sessions.clone(), Arc::new(tokens))
            .handle(ValidateAccessTokenQuery {
                token: "forged".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.auth_failure(), Some(AuthFailure::TokenInvalid));
    }
}
