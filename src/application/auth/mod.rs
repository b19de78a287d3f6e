//! Authentication and session use cases

mod commands;
mod queries;
mod session;

pub use commands::{
    ForgotPasswordCommand, ForgotPasswordHandler, LoginCommand, LoginHandler, LogoutCommand,
    LogoutHandler, PurgeExpiredSessionsHandler, RefreshTokenCommand, RefreshTokenHandler,
    RegisterCommand, RegisterHandler, ResetPasswordCommand, ResetPasswordHandler,
    RevokeSessionCommand, RevokeSessionHandler, RESET_REQUESTED_MESSAGE,
};
pub use queries::{
    GetUserSessionsHandler, GetUserSessionsQuery, ValidateAccessTokenHandler,
    ValidateAccessTokenQuery,
};
pub use session::{AuthSettings, SessionIssuer, TOKEN_TYPE};
