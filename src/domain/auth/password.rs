//! Password hashing port

use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Hash and verify credentials.
///
/// `verify` answers `Ok(false)` for a wrong password and reserves `Err` for a
/// hash it cannot interpret or a backend failure.
#[cfg_attr(test, automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, DomainError>;

    fn verify(&self, password: &str, hash: &str) -> Result<bool, DomainError>;
}
