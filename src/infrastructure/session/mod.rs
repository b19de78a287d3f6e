//! Session and password reset storage

mod repository;
mod reset_repository;

pub use repository::InMemorySessionRepository;
pub use reset_repository::InMemoryPasswordResetRepository;
