//! Authentication adapters: Argon2 hashing, JWT access tokens, opaque
//! refresh/reset tokens and reset delivery

mod jwt;
mod notifier;
mod password;
mod token;

pub use jwt::{JwtConfig, JwtTokenIssuer};
pub use notifier::{InMemoryResetNotifier, ResetDelivery, TracingResetNotifier};
pub use password::Argon2Hasher;
pub use token::{generate_opaque_token, hash_token, OpaqueToken};
