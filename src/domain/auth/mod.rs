//! Authentication ports: credential hashing, access token issuance and
//! reset token delivery

mod notifier;
mod password;
mod token;

pub use notifier::PasswordResetNotifier;
pub use password::PasswordHasher;
pub use token::{AccessClaims, IssuedToken, TokenIssuer};

#[cfg(test)]
pub use notifier::MockPasswordResetNotifier;
#[cfg(test)]
pub use password::MockPasswordHasher;
#[cfg(test)]
pub use token::MockTokenIssuer;
