//! Role infrastructure module

mod repository;

pub use repository::InMemoryRoleRepository;
