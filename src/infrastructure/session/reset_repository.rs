//! In-memory password reset repository implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::session::{PasswordResetRepository, PasswordResetToken};
use crate::domain::{DomainError, UserId};

/// In-memory implementation of PasswordResetRepository
#[derive(Debug, Default)]
pub struct InMemoryPasswordResetRepository {
    tokens: Arc<RwLock<HashMap<Uuid, PasswordResetToken>>>,
    should_fail: Arc<RwLock<bool>>,
}

impl InMemoryPasswordResetRepository {
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
                "In-memory password reset repository configured to fail",
            ));
        }
        Ok(())
    }

    /// Grants issued to a user, used or not
    pub async fn tokens_for(&self, user_id: UserId) -> Vec<PasswordResetToken> {
        self.tokens
            .read()
            .await
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PasswordResetRepository for InMemoryPasswordResetRepository {
    async fn create(&self, token: &PasswordResetToken) -> Result<(), DomainError> {
        self.check_should_fail().await?;
        self.tokens.write().await.insert(token.id, token.clone());
        Ok(())
    }

    async fn find_by_token_hash(
        &self,
        hash: &str,
    ) -> Result<Option<PasswordResetToken>, DomainError> {
        self.check_should_fail().await?;
        let tokens = self.tokens.read().await;
        Ok(tokens.values().find(|t| t.token_hash == hash).cloned())
    }

    async fn consume(&self, id: Uuid) -> Result<bool, DomainError> {
        self.check_should_fail().await?;
        let mut tokens = self.tokens.write().await;

        let Some(token) = tokens.get_mut(&id) else {
            return Err(DomainError::not_found(format!(
                "Password reset token '{}' not found",
                id
            )));
        };
        if token.is_used() {
            return Ok(false);
        }

        token.mark_used();
        Ok(true)
    }

    async fn invalidate_all_for_user(&self, user_id: UserId) -> Result<usize, DomainError> {
        self.check_should_fail().await?;
        let mut tokens = self.tokens.write().await;

        let mut count = 0;
        for token in tokens.values_mut() {
            if token.user_id == user_id && !token.is_used() {
                token.mark_used();
                count += 1;
            }
        }
        Ok(count)
    }
}
