//! In-memory session repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::session::{RevocationReason, Session, SessionRepository};
use crate::domain::{DomainError, SessionId, UserId};

/// In-memory implementation of SessionRepository
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
    should_fail: Arc<RwLock<bool>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether operations should fail
    pub async fn set_should_fail(&self, fail: bool) {
        *self.should_fail.write().await = fail;
    }

    async fn check_should_fail(&self) -> Result<(), DomainError> {
        if *self.should_fail.read().await {
            return Err(DomainError::infrastructure(
                "In-memory session repository configured to fail",
            ));
        }
        Ok(())
    }

    /// Number of stored sessions, revoked ones included
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create(&self, session: &Session) -> Result<(), DomainError> {
        self.check_should_fail().await?;
        let mut sessions = self.sessions.write().await;

        if sessions.contains_key(&session.id) {
            return Err(DomainError::already_exists(format!(
                "Session '{}' already exists",
                session.id
            )));
        }

        sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, DomainError> {
        self.check_should_fail().await?;
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn find_by_refresh_token_hash(
        &self,
        hash: &str,
    ) -> Result<Option<Session>, DomainError> {
        self.check_should_fail().await?;
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .find(|s| s.refresh_token_hash == hash)
            .cloned())
    }

    async fn find_active_by_user(&self, user_id: UserId) -> Result<Vec<Session>, DomainError> {
        self.check_should_fail().await?;
        let now = Utc::now();
        let sessions = self.sessions.read().await;

        let mut active: Vec<Session> = sessions
            .values()
            .filter(|s| s.user_id == user_id && s.is_active_at(now))
            .cloned()
            .collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(active)
    }

    async fn update(&self, session: &Session) -> Result<(), DomainError> {
        self.check_should_fail().await?;
        let mut sessions = self.sessions.write().await;

        if !sessions.contains_key(&session.id) {
            return Err(DomainError::not_found(format!(
                "Session '{}' not found",
                session.id
            )));
        }

        sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn revoke(&self, id: SessionId, reason: RevocationReason) -> Result<bool, DomainError> {
        self.check_should_fail().await?;
        let mut sessions = self.sessions.write().await;

        Ok(sessions
            .get_mut(&id)
            .map(|session| session.revoke(reason))
            .unwrap_or(false))
    }

    async fn revoke_all_for_user(
        &self,
        user_id: UserId,
        reason: RevocationReason,
        keep: Option<SessionId>,
    ) -> Result<usize, DomainError> {
        self.check_should_fail().await?;
        let mut sessions = self.sessions.write().await;

        let revoked = sessions
            .values_mut()
            .filter(|s| s.user_id == user_id && Some(s.id) != keep)
            .map(|s| s.revoke(reason))
            .filter(|changed| *changed)
            .count();
        Ok(revoked)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        self.check_should_fail().await?;
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        Ok(before - sessions.len())
    }
}
