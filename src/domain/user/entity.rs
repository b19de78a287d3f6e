//! User aggregate and related types

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::validation::{validate_full_name, UserValidationError};
use crate::domain::error::{AuthFailure, Violation};
use crate::domain::event::{DomainEvent, EventBuffer, EventEnvelope};
use crate::domain::id::{RoleId, UserId};
use crate::domain::DomainError;

/// Status of a user account
///
/// `pending -> active -> {inactive, banned}`, `inactive -> active`,
/// `banned -> active`. Deletion is tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Created but not yet activated
    #[default]
    Pending,
    /// Account in good standing
    Active,
    /// Deactivated by an administrator
    Inactive,
    /// Banned, with a recorded reason
    Banned,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Banned => "banned",
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "banned" => Ok(Self::Banned),
            other => Err(DomainError::validation(format!(
                "Unknown user status '{}'",
                other
            ))),
        }
    }
}

/// Persisted state of a user, used by storage adapters to rebuild the aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub id: UserId,
    pub email: Email,
    pub password_hash: String,
    pub full_name: String,
    pub status: UserStatus,
    pub ban_reason: Option<String>,
    pub role_ids: BTreeSet<RoleId>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// User aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    email: Email,
    /// Argon2 password hash - never exposed in serialization
    #[serde(skip_serializing)]
    password_hash: String,
    full_name: String,
    status: UserStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    ban_reason: Option<String>,
    role_ids: BTreeSet<RoleId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    events: EventBuffer,
}

impl User {
    /// Create a new pending user and record `UserCreated`
    pub fn new(
        email: Email,
        password_hash: impl Into<String>,
        full_name: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let full_name = full_name.into().trim().to_string();
        validate_full_name(&full_name)?;

        let password_hash = password_hash.into();
        if password_hash.is_empty() {
            return Err(DomainError::validation("Password hash cannot be empty"));
        }

        let now = Utc::now();
        let mut user = Self {
            id: UserId::new(),
            email,
            password_hash,
            full_name,
            status: UserStatus::Pending,
            ban_reason: None,
            role_ids: BTreeSet::new(),
            last_login_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            events: EventBuffer::default(),
        };

        user.events.record(DomainEvent::UserCreated {
            user_id: user.id,
            email: user.email.as_str().to_string(),
            status: user.status,
        });

        Ok(user)
    }

    /// Rebuild a user from storage without validation or events
    pub fn reconstruct(snapshot: UserSnapshot) -> Self {
        Self {
            id: snapshot.id,
            email: snapshot.email,
            password_hash: snapshot.password_hash,
            full_name: snapshot.full_name,
            status: snapshot.status,
            ban_reason: snapshot.ban_reason,
            role_ids: snapshot.role_ids,
            last_login_at: snapshot.last_login_at,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
            deleted_at: snapshot.deleted_at,
            events: EventBuffer::default(),
        }
    }

    pub fn to_snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            id: self.id,
            email: self.email.clone(),
            password_hash: self.password_hash.clone(),
            full_name: self.full_name.clone(),
            status: self.status,
            ban_reason: self.ban_reason.clone(),
            role_ids: self.role_ids.clone(),
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }

    // Getters

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn status(&self) -> UserStatus {
        self.status
    }

    pub fn ban_reason(&self) -> Option<&str> {
        self.ban_reason.as_deref()
    }

    pub fn role_ids(&self) -> &BTreeSet<RoleId> {
        &self.role_ids
    }

    pub fn has_role(&self, role_id: RoleId) -> bool {
        self.role_ids.contains(&role_id)
    }

    pub fn last_login_at(&self) -> Option<DateTime<Utc>> {
        self.last_login_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether this account may open a new session
    pub fn ensure_can_login(&self) -> Result<(), AuthFailure> {
        if self.is_deleted() {
            return Err(AuthFailure::InvalidCredentials);
        }

        match self.status {
            UserStatus::Banned => Err(AuthFailure::AccountBanned),
            UserStatus::Inactive => Err(AuthFailure::AccountInactive),
            UserStatus::Pending | UserStatus::Active => Ok(()),
        }
    }

    // Events

    pub fn domain_events(&self) -> &[EventEnvelope] {
        self.events.as_slice()
    }

    pub fn take_events(&mut self) -> Vec<EventEnvelope> {
        self.events.take()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    // Mutators

    pub fn update_profile(&mut self, full_name: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_not_deleted()?;

        let full_name = full_name.into().trim().to_string();
        validate_full_name(&full_name)?;

        self.full_name = full_name.clone();
        self.touch();
        self.events.record(DomainEvent::UserProfileUpdated {
            user_id: self.id,
            full_name,
        });

        Ok(())
    }

    /// Replace the credential hash. The caller verifies the current password.
    pub fn change_password(&mut self, new_hash: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_not_deleted()?;

        let new_hash = new_hash.into();
        if new_hash.is_empty() {
            return Err(DomainError::validation("Password hash cannot be empty"));
        }

        self.password_hash = new_hash;
        self.touch();
        self.events
            .record(DomainEvent::UserPasswordChanged { user_id: self.id });

        Ok(())
    }

    pub fn activate(&mut self) -> Result<(), DomainError> {
        self.ensure_not_deleted()?;

        if self.status == UserStatus::Active {
            return Err(DomainError::invalid_state("cannot activate: user is already active"));
        }

        let previous_status = self.status;
        self.status = UserStatus::Active;
        self.ban_reason = None;
        self.touch();
        self.events.record(DomainEvent::UserActivated {
            user_id: self.id,
            previous_status,
        });

        Ok(())
    }

    pub fn deactivate(&mut self) -> Result<(), DomainError> {
        self.ensure_not_deleted()?;

        if self.status != UserStatus::Active {
            return Err(DomainError::invalid_state(format!(
                "cannot deactivate: user is {}",
                self.status
            )));
        }

        self.status = UserStatus::Inactive;
        self.touch();
        self.events
            .record(DomainEvent::UserDeactivated { user_id: self.id });

        Ok(())
    }

    pub fn ban(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_not_deleted()?;

        let reason = reason.into().trim().to_string();
        if reason.is_empty() {
            return Err(UserValidationError::EmptyBanReason.into());
        }

        self.status = UserStatus::Banned;
        self.ban_reason = Some(reason.clone());
        self.touch();
        self.events.record(DomainEvent::UserBanned {
            user_id: self.id,
            reason,
        });

        Ok(())
    }

    pub fn assign_role(&mut self, role_id: RoleId) -> Result<(), DomainError> {
        self.ensure_not_deleted()?;

        if !self.role_ids.insert(role_id) {
            return Err(Violation::RoleAlreadyAssigned.into());
        }

        self.touch();
        self.events.record(DomainEvent::UserRoleAssigned {
            user_id: self.id,
            role_id,
        });

        Ok(())
    }

    pub fn revoke_role(&mut self, role_id: RoleId) -> Result<(), DomainError> {
        self.ensure_not_deleted()?;

        if !self.role_ids.remove(&role_id) {
            return Err(Violation::RoleNotAssigned.into());
        }

        self.touch();
        self.events.record(DomainEvent::UserRoleRevoked {
            user_id: self.id,
            role_id,
        });

        Ok(())
    }

    /// Replace the whole role set.
    ///
    /// Duplicates in the input collapse; an identical set is a no-op and records
    /// no event. Returns whether the set changed.
    pub fn set_roles(
        &mut self,
        role_ids: impl IntoIterator<Item = RoleId>,
    ) -> Result<bool, DomainError> {
        self.ensure_not_deleted()?;

        let next: BTreeSet<RoleId> = role_ids.into_iter().collect();
        if next == self.role_ids {
            return Ok(false);
        }

        self.role_ids = next;
        self.touch();
        self.events.record(DomainEvent::UserRolesChanged {
            user_id: self.id,
            role_ids: self.role_ids.iter().copied().collect(),
        });

        Ok(true)
    }

    /// Soft delete
    pub fn delete(&mut self) -> Result<(), DomainError> {
        if self.is_deleted() {
            return Err(DomainError::invalid_state("user is already deleted"));
        }

        let now = Utc::now();
        self.deleted_at = Some(now);
        self.updated_at = now;
        self.events.record(DomainEvent::UserDeleted { user_id: self.id });

        Ok(())
    }

    pub fn record_login(&mut self) {
        self.last_login_at = Some(Utc::now());
    }

    fn ensure_not_deleted(&self) -> Result<(), DomainError> {
        if self.is_deleted() {
            return Err(DomainError::invalid_state("user is deleted"));
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_user() -> User {
        let email = Email::parse("a@x.com").unwrap();
        let mut user = User::new(email, "hashed_password", "Ada").unwrap();
        user.clear_events();
        user
    }

    fn event_types(user: &User) -> Vec<&'static str> {
        user.domain_events().iter().map(|e| e.event_type()).collect()
    }

    #[test]
    fn test_user_creation() {
        let email = Email::parse("A@X.com").unwrap();
        let user = User::new(email, "hashed_password", "  Ada  ").unwrap();

        assert_eq!(user.email().as_str(), "a@x.com");
        assert_eq!(user.full_name(), "Ada");
        assert_eq!(user.status(), UserStatus::Pending);
        assert!(user.role_ids().is_empty());
        assert!(!user.is_deleted());
        assert_eq!(event_types(&user), vec!["user.created"]);
    }

    #[test]
    fn test_user_creation_requires_name() {
        let email = Email::parse("a@x.com").unwrap();
        let err = User::new(email, "hash", " ").unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            UserStatus::Pending,
            UserStatus::Active,
            UserStatus::Inactive,
            UserStatus::Banned,
        ] {
            assert_eq!(status.as_str().parse::<UserStatus>().unwrap(), status);
        }
        assert!("frozen".parse::<UserStatus>().is_err());
    }

    #[test]
    fn test_activate_from_pending() {
        let mut user = create_test_user();

        user.activate().unwrap();

        assert_eq!(user.status(), UserStatus::Active);
        assert_eq!(event_types(&user), vec!["user.activated"]);
    }

    #[test]
    fn test_activate_twice_fails() {
        let mut user = create_test_user();
        user.activate().unwrap();

        let err = user.activate().unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
        assert!(err.to_string().contains("cannot activate"));
    }

    #[test]
    fn test_deactivate_requires_active() {
        let mut user = create_test_user();

        assert!(matches!(
            user.deactivate(),
            Err(DomainError::InvalidState { .. })
        ));

        user.activate().unwrap();
        user.deactivate().unwrap();
        assert_eq!(user.status(), UserStatus::Inactive);

        user.activate().unwrap();
        assert_eq!(user.status(), UserStatus::Active);
    }

    #[test]
    fn test_ban_and_reactivate() {
        let mut user = create_test_user();

        user.ban("chargeback fraud").unwrap();
        assert_eq!(user.status(), UserStatus::Banned);
        assert_eq!(user.ban_reason(), Some("chargeback fraud"));
        assert_eq!(user.ensure_can_login(), Err(AuthFailure::AccountBanned));

        user.activate().unwrap();
        assert_eq!(user.status(), UserStatus::Active);
        assert!(user.ban_reason().is_none());
    }

    #[test]
    fn test_ban_requires_reason() {
        let mut user = create_test_user();
        assert!(user.ban("  ").is_err());
        assert_eq!(user.status(), UserStatus::Pending);
    }

    #[test]
    fn test_assign_role_twice_fails() {
        let mut user = create_test_user();
        let role = RoleId::new();

        user.assign_role(role).unwrap();
        let err = user.assign_role(role).unwrap_err();

        assert_eq!(err.violation(), Some(Violation::RoleAlreadyAssigned));
        assert_eq!(user.role_ids().len(), 1);
        assert_eq!(event_types(&user), vec!["user.role_assigned"]);
    }

    #[test]
    fn test_revoke_absent_role_fails() {
        let mut user = create_test_user();
        let role = RoleId::new();

        let err = user.revoke_role(role).unwrap_err();
        assert_eq!(err.violation(), Some(Violation::RoleNotAssigned));

        user.assign_role(role).unwrap();
        user.revoke_role(role).unwrap();
        assert!(!user.has_role(role));
    }

    #[test]
    fn test_set_roles_is_idempotent() {
        let mut user = create_test_user();
        let r1 = RoleId::new();
        let r2 = RoleId::new();

        assert!(user.set_roles(vec![r1, r2, r1]).unwrap());
        assert_eq!(user.role_ids().len(), 2);

        assert!(!user.set_roles(vec![r2, r1]).unwrap());
        assert_eq!(event_types(&user), vec!["user.roles_changed"]);

        assert!(user.set_roles(Vec::new()).unwrap());
        assert!(user.role_ids().is_empty());
    }

    #[test]
    fn test_delete_is_terminal() {
        let mut user = create_test_user();

        user.delete().unwrap();
        assert!(user.is_deleted());
        assert!(user.delete().is_err());
        assert!(user.update_profile("New").is_err());
        assert!(user.activate().is_err());
        assert_eq!(
            user.ensure_can_login(),
            Err(AuthFailure::InvalidCredentials)
        );
    }

    #[test]
    fn test_change_password() {
        let mut user = create_test_user();

        user.change_password("new_hash").unwrap();
        assert_eq!(user.password_hash(), "new_hash");
        assert_eq!(event_types(&user), vec!["user.password_changed"]);
    }

    #[test]
    fn test_snapshot_round_trip_drops_events() {
        let email = Email::parse("a@x.com").unwrap();
        let user = User::new(email, "hash", "Ada").unwrap();
        assert_eq!(user.domain_events().len(), 1);

        let rebuilt = User::reconstruct(user.to_snapshot());
        assert_eq!(rebuilt.id(), user.id());
        assert_eq!(rebuilt.email(), user.email());
        assert!(rebuilt.domain_events().is_empty());
    }

    #[test]
    fn test_user_serialization_excludes_password() {
        let user = create_test_user();

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("hashed_password"));
        assert!(!json.contains("password_hash"));
    }
}
