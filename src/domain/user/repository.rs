//! User repository trait

use async_trait::async_trait;

use super::email::Email;
use super::entity::{User, UserStatus};
use crate::domain::id::{RoleId, UserId};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Query parameters for listing users
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserQuery {
    /// Filter by status
    pub status: Option<UserStatus>,
    /// Filter by assigned role
    pub role_id: Option<RoleId>,
    /// Case-insensitive match against email or full name
    pub search: Option<String>,
    /// Maximum number of results
    pub limit: Option<usize>,
    /// Offset for pagination
    pub offset: Option<usize>,
}

impl UserQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_role(mut self, role_id: RoleId) -> Self {
        self.role_id = Some(role_id);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Whether a user satisfies the filters (pagination excluded)
    pub fn matches(&self, user: &User) -> bool {
        if let Some(status) = self.status {
            if user.status() != status {
                return false;
            }
        }

        if let Some(role_id) = self.role_id {
            if !user.has_role(role_id) {
                return false;
            }
        }

        if let Some(search) = &self.search {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty()
                && !user.email().as_str().contains(&needle)
                && !user.full_name().to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        true
    }
}

/// Repository port for user persistence.
///
/// Soft-deleted users are invisible to every finder. Implementations enforce
/// email uniqueness among non-deleted users and per-row atomicity of `update`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Get a user by ID
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError>;

    /// Get a user by canonical email (for login)
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, DomainError>;

    /// All users holding the given role
    async fn find_by_role(&self, role_id: RoleId) -> Result<Vec<User>, DomainError>;

    /// List users matching a query, ordered by creation time
    async fn list(&self, query: &UserQuery) -> Result<Vec<User>, DomainError>;

    /// Count users matching a query (pagination ignored)
    async fn count(&self, query: &UserQuery) -> Result<usize, DomainError>;

    /// Insert a new user
    async fn create(&self, user: &User) -> Result<(), DomainError>;

    /// Persist the current state of an existing user
    async fn update(&self, user: &User) -> Result<(), DomainError>;

    /// Soft delete a user; returns false if no live user had this ID
    async fn delete(&self, id: UserId) -> Result<bool, DomainError>;
}
