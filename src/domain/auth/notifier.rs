//! Delivery port for password reset tokens

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::user::Email;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Hands a raw reset token to the account owner (mail, SMS, ...).
///
/// The raw token exists only in this call; storage keeps its digest.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PasswordResetNotifier: Send + Sync {
    async fn send_reset_token(
        &self,
        email: &Email,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;
}
