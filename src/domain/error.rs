use thiserror::Error;

/// Invariant breaches reported by aggregates and command handlers.
///
/// These are compared by identity (`==` / `matches!`) so callers can react to a
/// specific rule without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("system role cannot be modified or deleted")]
    SystemRoleImmutable,

    #[error("default role cannot be deleted")]
    DefaultRoleNotDeletable,

    #[error("role is assigned to users")]
    RoleInUse,

    #[error("permission already assigned to role")]
    PermissionAlreadyAssigned,

    #[error("permission not assigned to role")]
    PermissionNotAssigned,

    #[error("role already assigned to user")]
    RoleAlreadyAssigned,

    #[error("role not assigned to user")]
    RoleNotAssigned,

    #[error("system permission cannot be modified or deleted")]
    SystemPermissionImmutable,

    #[error("permission is assigned to roles")]
    PermissionInUse,
}

/// Reasons an authentication attempt or token presentation is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is banned")]
    AccountBanned,

    #[error("account is inactive")]
    AccountInactive,

    #[error("token is invalid")]
    TokenInvalid,

    #[error("token has expired")]
    TokenExpired,

    #[error("token has been revoked")]
    TokenRevoked,

    #[error("refresh token was already used")]
    TokenReused,
}

/// Coarse error classification, one per row of the HTTP mapping table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidState,
    InvariantViolation,
    Validation,
    Authentication,
    Infrastructure,
}

impl ErrorKind {
    /// HTTP status an adapter is expected to answer with
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::AlreadyExists | Self::InvariantViolation | Self::InvalidState => 409,
            Self::Validation => 400,
            Self::Authentication => 401,
            Self::Infrastructure => 500,
        }
    }
}

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Already exists: {message}")]
    AlreadyExists { message: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Invariant violation: {0}")]
    InvariantViolation(Violation),

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Authentication failed: {0}")]
    Authentication(AuthFailure),

    #[error("Infrastructure error: {message}")]
    Infrastructure { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::AlreadyExists {
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::Infrastructure {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::InvariantViolation(_) => ErrorKind::InvariantViolation,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Infrastructure { .. } => ErrorKind::Infrastructure,
        }
    }

    /// The violated invariant, if this is an invariant error
    pub fn violation(&self) -> Option<Violation> {
        match self {
            Self::InvariantViolation(v) => Some(*v),
            _ => None,
        }
    }

    /// The authentication failure reason, if this is an authentication error
    pub fn auth_failure(&self) -> Option<AuthFailure> {
        match self {
            Self::Authentication(f) => Some(*f),
            _ => None,
        }
    }

    /// Prefix infrastructure errors with the operation that failed.
    ///
    /// Domain errors are returned untouched so callers can still match on them.
    pub fn with_context(self, context: &str) -> Self {
        match self {
            Self::Infrastructure { message } => Self::Infrastructure {
                message: format!("{}: {}", context, message),
            },
            other => other,
        }
    }
}

impl From<Violation> for DomainError {
    fn from(violation: Violation) -> Self {
        Self::InvariantViolation(violation)
    }
}

impl From<AuthFailure> for DomainError {
    fn from(failure: AuthFailure) -> Self {
        Self::Authentication(failure)
    }
}

/// Adds operation context to infrastructure failures on a `Result`
pub trait ResultExt<T> {
    fn context(self, context: &str) -> Result<T, DomainError>;
}

impl<T> ResultExt<T> for Result<T, DomainError> {
    fn context(self, context: &str) -> Result<T, DomainError> {
        self.map_err(|e| e.with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("User 'u-1' not found");
        assert_eq!(error.to_string(), "Not found: User 'u-1' not found");
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_violation_display() {
        let error = DomainError::from(Violation::PermissionNotAssigned);
        assert_eq!(
            error.to_string(),
            "Invariant violation: permission not assigned to role"
        );
        assert_eq!(error.violation(), Some(Violation::PermissionNotAssigned));
    }

    #[test]
    fn test_context_wraps_infrastructure_only() {
        let wrapped = DomainError::infrastructure("connection reset").with_context("save user");
        assert_eq!(
            wrapped.to_string(),
            "Infrastructure error: save user: connection reset"
        );

        let untouched = DomainError::from(Violation::RoleInUse).with_context("delete role");
        assert_eq!(untouched.violation(), Some(Violation::RoleInUse));
    }

    #[test]
    fn test_result_ext() {
        let result: Result<(), DomainError> = Err(DomainError::infrastructure("timeout"));
        let err = result.context("load role").unwrap_err();
        assert!(err.to_string().contains("load role: timeout"));
    }

    #[test]
    fn test_http_mapping() {
        assert_eq!(ErrorKind::NotFound.http_status(), 404);
        assert_eq!(ErrorKind::AlreadyExists.http_status(), 409);
        assert_eq!(ErrorKind::InvariantViolation.http_status(), 409);
        assert_eq!(ErrorKind::Validation.http_status(), 400);
        assert_eq!(ErrorKind::Authentication.http_status(), 401);
        assert_eq!(ErrorKind::Infrastructure.http_status(), 500);
    }

    #[test]
    fn test_auth_failure() {
        let error = DomainError::from(AuthFailure::TokenRevoked);
        assert_eq!(error.kind(), ErrorKind::Authentication);
        assert_eq!(error.auth_failure(), Some(AuthFailure::TokenRevoked));
    }
}
