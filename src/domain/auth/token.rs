//! Access token port and claims

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::id::{RoleId, SessionId, UserId};
use crate::domain::session::Session;
use crate::domain::user::User;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Token ID, equal to the session ID
    pub jti: String,
    pub email: String,
    /// Role IDs at issue time
    #[serde(default)]
    pub roles: Vec<String>,
    pub iss: String,
    /// Issued at (Unix epoch seconds)
    pub iat: i64,
    /// Expiration (Unix epoch seconds)
    pub exp: i64,
}

impl AccessClaims {
    pub fn new(user: &User, session: &Session, issuer: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user.id().to_string(),
            jti: session.id.to_string(),
            email: user.email().to_string(),
            roles: user.role_ids().iter().map(|r| r.to_string()).collect(),
            iss: issuer.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn user_id(&self) -> Result<UserId, DomainError> {
        self.sub.parse()
    }

    pub fn session_id(&self) -> Result<SessionId, DomainError> {
        self.jti.parse()
    }

    pub fn role_ids(&self) -> Result<Vec<RoleId>, DomainError> {
        self.roles.iter().map(|r| r.parse()).collect()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// A freshly signed access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies access tokens.
///
/// `decode_access_token` fails with `AuthFailure::TokenExpired` for an expired
/// token and `AuthFailure::TokenInvalid` for anything else it rejects.
#[cfg_attr(test, automock)]
pub trait TokenIssuer: Send + Sync {
    fn issue_access_token(
        &self,
        user: &User,
        session: &Session,
        ttl: Duration,
    ) -> Result<IssuedToken, DomainError>;

    fn decode_access_token(&self, token: &str) -> Result<AccessClaims, DomainError>;
}
