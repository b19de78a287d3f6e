//! Authentication metrics
//!
//! Uses the `metrics` facade; nothing is recorded unless the embedding
//! process installs a recorder.

use metrics::counter;

/// Authentication flow being measured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    Register,
    Login,
    Refresh,
    Logout,
    ForgotPassword,
    ResetPassword,
    ChangePassword,
    ValidateToken,
}

impl AuthFlow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Login => "login",
            Self::Refresh => "refresh",
            Self::Logout => "logout",
            Self::ForgotPassword => "forgot_password",
            Self::ResetPassword => "reset_password",
            Self::ChangePassword => "change_password",
            Self::ValidateToken => "validate_token",
        }
    }
}

/// Count one attempt of `flow`; `outcome` is "success" or a failure label
pub fn record_auth_attempt(flow: AuthFlow, outcome: &str) {
    let labels = [
        ("flow", flow.as_str().to_string()),
        ("outcome", outcome.to_string()),
    ];

    counter!("identity_auth_attempts_total", &labels).increment(1);
}

/// Record the outcome of a flow from its result
pub fn record_auth_result<T>(flow: AuthFlow, result: &Result<T, crate::domain::DomainError>) {
    let outcome = match result {
        Ok(_) => "success".to_string(),
        Err(e) => match e.auth_failure() {
            Some(failure) => failure_label(failure).to_string(),
            None => format!("{:?}", e.kind()).to_lowercase(),
        },
    };
    record_auth_attempt(flow, &outcome);
}

fn failure_label(failure: crate::domain::AuthFailure) -> &'static str {
    use crate::domain::AuthFailure;

    match failure {
        AuthFailure::InvalidCredentials => "invalid_credentials",
        AuthFailure::AccountBanned => "account_banned",
        AuthFailure::AccountInactive => "account_inactive",
        AuthFailure::TokenInvalid => "token_invalid",
        AuthFailure::TokenExpired => "token_expired",
        AuthFailure::TokenRevoked => "token_revoked",
        AuthFailure::TokenReused => "token_reused",
    }
}
