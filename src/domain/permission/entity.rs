//! Permission aggregate and its derived code

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{validate_description, validate_segment, PermissionValidationError};
use crate::domain::error::Violation;
use crate::domain::event::{DomainEvent, EventBuffer, EventEnvelope};
use crate::domain::id::PermissionId;
use crate::domain::DomainError;

const WILDCARD: &str = "*";

/// Canonical `resource:action` code, derived once from its two halves
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionCode {
    resource: String,
    action: String,
}

impl PermissionCode {
    pub fn new(
        resource: impl AsRef<str>,
        action: impl AsRef<str>,
    ) -> Result<Self, PermissionValidationError> {
        let resource = resource.as_ref().trim().to_lowercase();
        let action = action.as_ref().trim().to_lowercase();

        validate_segment("resource", &resource)?;
        validate_segment("action", &action)?;

        Ok(Self { resource, action })
    }

    pub fn parse(code: &str) -> Result<Self, PermissionValidationError> {
        match code.trim().split_once(':') {
            Some((resource, action)) if !action.contains(':') => Self::new(resource, action),
            _ => Err(PermissionValidationError::InvalidCode(code.to_string())),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Whether holding this code grants `requested`.
    ///
    /// `*` on either half matches anything in that half.
    pub fn grants(&self, requested: &PermissionCode) -> bool {
        let resource_ok = self.resource == WILDCARD || self.resource == requested.resource;
        let action_ok = self.action == WILDCARD || self.action == requested.action;
        resource_ok && action_ok
    }
}

impl std::fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

impl FromStr for PermissionCode {
    type Err = PermissionValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PermissionCode {
    type Error = PermissionValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PermissionCode> for String {
    fn from(code: PermissionCode) -> Self {
        code.to_string()
    }
}

/// Persisted state of a permission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionSnapshot {
    pub id: PermissionId,
    pub code: PermissionCode,
    pub description: String,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Permission aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    id: PermissionId,
    code: PermissionCode,
    description: String,
    is_system: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: EventBuffer,
}

impl Permission {
    /// Create a new, editable permission
    pub fn new(
        resource: impl AsRef<str>,
        action: impl AsRef<str>,
        description: impl Into<String>,
    ) -> Result<Self, DomainError> {
        Self::build(resource, action, description, false)
    }

    /// Create a built-in permission that can never be edited or deleted
    pub fn new_system(
        resource: impl AsRef<str>,
        action: impl AsRef<str>,
        description: impl Into<String>,
    ) -> Result<Self, DomainError> {
        Self::build(resource, action, description, true)
    }

    fn build(
        resource: impl AsRef<str>,
        action: impl AsRef<str>,
        description: impl Into<String>,
        is_system: bool,
    ) -> Result<Self, DomainError> {
        let code = PermissionCode::new(resource, action)?;
        let description = description.into().trim().to_string();
        validate_description(&description)?;

        let now = Utc::now();
        let mut permission = Self {
            id: PermissionId::new(),
            code,
            description,
            is_system,
            created_at: now,
            updated_at: now,
            events: EventBuffer::default(),
        };

        permission.events.record(DomainEvent::PermissionCreated {
            permission_id: permission.id,
            code: permission.code.to_string(),
        });

        Ok(permission)
    }

    /// Rebuild a permission from storage without validation or events
    pub fn reconstruct(snapshot: PermissionSnapshot) -> Self {
        Self {
            id: snapshot.id,
            code: snapshot.code,
            description: snapshot.description,
            is_system: snapshot.is_system,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
            events: EventBuffer::default(),
        }
    }

    pub fn to_snapshot(&self) -> PermissionSnapshot {
        PermissionSnapshot {
            id: self.id,
            code: self.code.clone(),
            description: self.description.clone(),
            is_system: self.is_system,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn id(&self) -> PermissionId {
        self.id
    }

    pub fn code(&self) -> &PermissionCode {
        &self.code
    }

    pub fn resource(&self) -> &str {
        self.code.resource()
    }

    pub fn action(&self) -> &str {
        self.code.action()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_system(&self) -> bool {
        self.is_system
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn can_be_modified(&self) -> bool {
        !self.is_system
    }

    pub fn domain_events(&self) -> &[EventEnvelope] {
        self.events.as_slice()
    }

    pub fn take_events(&mut self) -> Vec<EventEnvelope> {
        self.events.take()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn update_description(&mut self, description: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_modifiable()?;

        let description = description.into().trim().to_string();
        validate_description(&description)?;

        self.description = description;
        self.updated_at = Utc::now();
        self.events.record(DomainEvent::PermissionUpdated {
            permission_id: self.id,
        });

        Ok(())
    }

    /// Check deletion rules and record `PermissionDeleted`
    pub fn delete(&mut self) -> Result<(), DomainError> {
        self.ensure_modifiable()?;

        self.events.record(DomainEvent::PermissionDeleted {
            permission_id: self.id,
            code: self.code.to_string(),
        });

        Ok(())
    }

    fn ensure_modifiable(&self) -> Result<(), DomainError> {
        if self.is_system {
            return Err(Violation::SystemPermissionImmutable.into());
        }
        Ok(())
    }
}
