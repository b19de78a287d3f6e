//! In-memory user repository implementation

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::user::{Email, User, UserQuery, UserRepository, UserSnapshot};
use crate::domain::{DomainError, RoleId, UserId};

/// In-memory implementation of UserRepository.
///
/// Rows are stored as snapshots, so pending events never leak into storage.
/// Soft-deleted rows are kept but hidden from every finder.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<UserId, UserSnapshot>>>,
    should_fail: Arc<RwLock<bool>>,
}

impl InMemoryUserRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository with initial users
    pub fn with_users(users: Vec<User>) -> Self {
        let rows = users
            .iter()
            .map(|user| (user.id(), user.to_snapshot()))
            .collect();

        Self {
            users: Arc::new(RwLock::new(rows)),
            should_fail: Arc::new(RwLock::new(false)),
        }
    }

    /// Set whether operations should fail
    pub async fn set_should_fail(&self, fail: bool) {
        *self.should_fail.write().await = fail;
    }

    async fn check_should_fail(&self) -> Result<(), DomainError> {
        if *self.should_fail.read().await {
            return Err(DomainError::infrastructure(
                "In-memory user repository configured to fail",
            ));
        }
        Ok(())
    }

    fn live(rows: &HashMap<UserId, UserSnapshot>) -> impl Iterator<Item = &UserSnapshot> {
        rows.values().filter(|row| row.deleted_at.is_none())
    }

    fn email_taken(rows: &HashMap<UserId, UserSnapshot>, email: &Email, except: UserId) -> bool {
        Self::live(rows).any(|row| row.email == *email && row.id != except)
    }

    fn matching(rows: &HashMap<UserId, UserSnapshot>, query: &UserQuery) -> Vec<User> {
        let mut users: Vec<User> = Self::live(rows)
            .cloned()
            .map(User::reconstruct)
            .filter(|user| query.matches(user))
            .collect();

        users.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        users
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        self.check_should_fail().await?;
        let users = self.users.read().await;

        Ok(users
            .get(&id)
            .filter(|row| row.deleted_at.is_none())
            .cloned()
            .map(User::reconstruct))
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, DomainError> {
        self.check_should_fail().await?;
        let users = self.users.read().await;

        Ok(Self::live(&users)
            .find(|row| row.email == *email)
            .cloned()
            .map(User::reconstruct))
    }

    async fn find_by_role(&self, role_id: RoleId) -> Result<Vec<User>, DomainError> {
        self.check_should_fail().await?;
        let users = self.users.read().await;

        Ok(Self::matching(&users, &UserQuery::new().with_role(role_id)))
    }

    async fn list(&self, query: &UserQuery) -> Result<Vec<User>, DomainError> {
        self.check_should_fail().await?;
        let users = self.users.read().await;

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        Ok(Self::matching(&users, query)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn count(&self, query: &UserQuery) -> Result<usize, DomainError> {
        self.check_should_fail().await?;
        let users = self.users.read().await;

        Ok(Self::matching(&users, query).len())
    }

    async fn create(&self, user: &User) -> Result<(), DomainError> {
        self.check_should_fail().await?;
        let mut users = self.users.write().await;

        if users.contains_key(&user.id()) {
            return Err(DomainError::already_exists(format!(
                "User with ID '{}' already exists",
                user.id()
            )));
        }

        if Self::email_taken(&users, user.email(), user.id()) {
            return Err(DomainError::already_exists(format!(
                "User with email '{}' already exists",
                user.email()
            )));
        }

        users.insert(user.id(), user.to_snapshot());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), DomainError> {
        self.check_should_fail().await?;
        let mut users = self.users.write().await;

        match users.get(&user.id()) {
            Some(row) if row.deleted_at.is_none() => {}
            _ => {
                return Err(DomainError::not_found(format!(
                    "User '{}' not found",
                    user.id()
                )));
            }
        }

        if Self::email_taken(&users, user.email(), user.id()) {
            return Err(DomainError::already_exists(format!(
                "User with email '{}' already exists",
                user.email()
            )));
        }

        users.insert(user.id(), user.to_snapshot());
        Ok(())
    }

    async fn delete(&self, id: UserId) -> Result<bool, DomainError> {
        self.check_should_fail().await?;
        let mut users = self.users.write().await;

        match users.get_mut(&id) {
            Some(row) if row.deleted_at.is_none() => {
                let now = Utc::now();
                row.deleted_at = Some(now);
                row.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
