//! Permission infrastructure module

mod repository;

pub use repository::InMemoryPermissionRepository;
