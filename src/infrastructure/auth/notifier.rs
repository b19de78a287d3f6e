//! Password reset delivery adapters

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::domain::auth::PasswordResetNotifier;
use crate::domain::user::Email;
use crate::domain::DomainError;

/// Logs that a reset was issued. The token itself is never logged.
#[derive(Debug, Clone, Default)]
pub struct TracingResetNotifier;

#[async_trait]
impl PasswordResetNotifier for TracingResetNotifier {
    async fn send_reset_token(
        &self,
        email: &Email,
        _token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        info!(email = %email, expires_at = %expires_at, "Password reset token issued");
        Ok(())
    }
}

/// A reset token handed to [`InMemoryResetNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetDelivery {
    pub email: Email,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Keeps every delivery in memory; used by tests and local tooling
#[derive(Debug, Clone, Default)]
pub struct InMemoryResetNotifier {
    deliveries: Arc<RwLock<Vec<ResetDelivery>>>,
}

impl InMemoryResetNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn deliveries(&self) -> Vec<ResetDelivery> {
        self.deliveries.read().await.clone()
    }

    /// Most recent token sent to `email`
    pub async fn last_token_for(&self, email: &Email) -> Option<String> {
        self.deliveries
            .read()
            .await
            .iter()
            .rev()
            .find(|d| d.email == *email)
            .map(|d| d.token.clone())
    }
}

#[async_trait]
impl PasswordResetNotifier for InMemoryResetNotifier {
    async fn send_reset_token(
        &self,
        email: &Email,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.deliveries.write().await.push(ResetDelivery {
            email: email.clone(),
            token: token.to_string(),
            expires_at,
        });
        Ok(())
    }
}
