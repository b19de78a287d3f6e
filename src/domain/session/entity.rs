//! Server-side session and password reset records

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::id::{SessionId, UserId};

/// Client details captured when a session is opened
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl ClientInfo {
    pub fn new(user_agent: Option<String>, ip_address: Option<String>) -> Self {
        Self {
            user_agent,
            ip_address,
        }
    }
}

/// Why a session stopped being usable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    /// The user signed out of this session
    Logout,
    /// The user signed out everywhere
    LogoutAll,
    /// Replaced by a newer session during refresh
    Rotated,
    /// The user revoked the session from their session list
    RevokedByUser,
    /// Password changed or reset
    PasswordChanged,
    /// Account banned, deactivated or deleted
    AccountDisabled,
    /// A rotated refresh token was presented again
    ReuseDetected,
    /// Evicted to stay under the per-user session limit
    SessionLimit,
}

impl RevocationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Logout => "logout",
            Self::LogoutAll => "logout_all",
            Self::Rotated => "rotated",
            Self::RevokedByUser => "revoked_by_user",
            Self::PasswordChanged => "password_changed",
            Self::AccountDisabled => "account_disabled",
            Self::ReuseDetected => "reuse_detected",
            Self::SessionLimit => "session_limit",
        }
    }
}

impl std::fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One issued token pair.
///
/// The session ID doubles as the access token's `jti`; the refresh token is
/// stored only as a digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    #[serde(skip_serializing)]
    pub refresh_token_hash: String,
    pub client: ClientInfo,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<RevocationReason>,
    /// Set when this session was rotated into a newer one
    pub replaced_by: Option<SessionId>,
}

impl Session {
    pub fn new(
        user_id: UserId,
        refresh_token_hash: impl Into<String>,
        client: ClientInfo,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            user_id,
            refresh_token_hash: refresh_token_hash.into(),
            client,
            created_at: now,
            last_used_at: now,
            expires_at: now + ttl,
            revoked_at: None,
            revoked_reason: None,
            replaced_by: None,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired_at(now)
    }

    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    /// Mark the session revoked. Revoking twice keeps the first reason.
    pub fn revoke(&mut self, reason: RevocationReason) -> bool {
        if self.is_revoked() {
            return false;
        }
        self.revoked_at = Some(Utc::now());
        self.revoked_reason = Some(reason);
        true
    }

    /// Retire this session in favour of `replacement`
    pub fn rotate_to(&mut self, replacement: SessionId) {
        self.revoke(RevocationReason::Rotated);
        self.replaced_by = Some(replacement);
    }

    /// Whether this session was retired by a refresh, so its token must not come back
    pub fn was_rotated(&self) -> bool {
        self.revoked_reason == Some(RevocationReason::Rotated)
    }

    pub fn touch(&mut self) {
        self.last_used_at = Utc::now();
    }
}

/// Single-use password reset grant; only the token digest is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: UserId,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl PasswordResetToken {
    pub fn new(user_id: UserId, token_hash: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash: token_hash.into(),
            created_at: now,
            expires_at: now + ttl,
            used_at: None,
        }
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    pub fn is_usable(&self) -> bool {
        !self.is_used() && !self.is_expired()
    }

    pub fn mark_used(&mut self) {
        if self.used_at.is_none() {
            self.used_at = Some(Utc::now());
        }
    }
}
