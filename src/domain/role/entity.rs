//! Role aggregate

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{validate_display_name, validate_role_description, validate_role_name};
use crate::domain::error::Violation;
use crate::domain::event::{DomainEvent, EventBuffer, EventEnvelope};
use crate::domain::id::{PermissionId, RoleId};
use crate::domain::DomainError;

/// Construction parameters for a new role
#[derive(Debug, Clone, Default)]
pub struct NewRoleParams {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub permission_ids: Vec<PermissionId>,
    pub is_system: bool,
    pub is_default: bool,
    pub priority: i32,
}

impl NewRoleParams {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_permissions(mut self, permission_ids: Vec<PermissionId>) -> Self {
        self.permission_ids = permission_ids;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn as_system(mut self) -> Self {
        self.is_system = true;
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Partial update of the editable role details; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleDetailsUpdate {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i32>,
    pub is_default: Option<bool>,
}

/// Persisted state of a role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSnapshot {
    pub id: RoleId,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub permission_ids: BTreeSet<PermissionId>,
    pub is_system: bool,
    pub is_default: bool,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role aggregate: a named set of permission IDs.
///
/// System roles reject every mutation. Default roles are granted to new
/// accounts and cannot be deleted, but stay editable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    name: String,
    display_name: String,
    description: String,
    permission_ids: BTreeSet<PermissionId>,
    is_system: bool,
    is_default: bool,
    priority: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: EventBuffer,
}

impl Role {
    /// Create a new role and record `RoleCreated`.
    ///
    /// Existence of the supplied permission IDs is the caller's concern.
    pub fn new(params: NewRoleParams) -> Result<Self, DomainError> {
        let name = params.name.trim().to_lowercase();
        validate_role_name(&name)?;

        let display_name = params.display_name.trim().to_string();
        validate_display_name(&display_name)?;

        let description = params.description.trim().to_string();
        validate_role_description(&description)?;

        let now = Utc::now();
        let mut role = Self {
            id: RoleId::new(),
            name,
            display_name,
            description,
            permission_ids: params.permission_ids.into_iter().collect(),
            is_system: params.is_system,
            is_default: params.is_default,
            priority: params.priority,
            created_at: now,
            updated_at: now,
            events: EventBuffer::default(),
        };

        role.events.record(DomainEvent::RoleCreated {
            role_id: role.id,
            name: role.name.clone(),
        });

        Ok(role)
    }

    /// Rebuild a role from storage without validation or events
    pub fn reconstruct(snapshot: RoleSnapshot) -> Self {
        Self {
            id: snapshot.id,
            name: snapshot.name,
            display_name: snapshot.display_name,
            description: snapshot.description,
            permission_ids: snapshot.permission_ids,
            is_system: snapshot.is_system,
            is_default: snapshot.is_default,
            priority: snapshot.priority,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
            events: EventBuffer::default(),
        }
    }

    pub fn to_snapshot(&self) -> RoleSnapshot {
        RoleSnapshot {
            id: self.id,
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            permission_ids: self.permission_ids.clone(),
            is_system: self.is_system,
            is_default: self.is_default,
            priority: self.priority,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    // Getters

    pub fn id(&self) -> RoleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn permission_ids(&self) -> &BTreeSet<PermissionId> {
        &self.permission_ids
    }

    pub fn has_permission(&self, permission_id: PermissionId) -> bool {
        self.permission_ids.contains(&permission_id)
    }

    pub fn is_system(&self) -> bool {
        self.is_system
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn priority(&self) -> i32 {
        self.priority
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

    pub fn can_be_deleted(&self) -> bool {
        !self.is_system && !self.is_default
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

    pub fn update_details(&mut self, update: RoleDetailsUpdate) -> Result<(), DomainError> {
        self.ensure_modifiable()?;

        let display_name = match update.display_name {
            Some(value) => {
                let value = value.trim().to_string();
                validate_display_name(&value)?;
                value
            }
            None => self.display_name.clone(),
        };

        let description = match update.description {
            Some(value) => {
                let value = value.trim().to_string();
                validate_role_description(&value)?;
                value
            }
            None => self.description.clone(),
        };

        self.display_name = display_name;
        self.description = description;
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(is_default) = update.is_default {
            self.is_default = is_default;
        }

        self.touch();
        self.events.record(DomainEvent::RoleUpdated { role_id: self.id });

        Ok(())
    }

    pub fn add_permission(&mut self, permission_id: PermissionId) -> Result<(), DomainError> {
        self.ensure_modifiable()?;

        if !self.permission_ids.insert(permission_id) {
            return Err(Violation::PermissionAlreadyAssigned.into());
        }

        self.touch();
        self.events.record(DomainEvent::RolePermissionAssigned {
            role_id: self.id,
            permission_id,
        });

        Ok(())
    }

    pub fn remove_permission(&mut self, permission_id: PermissionId) -> Result<(), DomainError> {
        self.ensure_modifiable()?;

        if !self.permission_ids.remove(&permission_id) {
            return Err(Violation::PermissionNotAssigned.into());
        }

        self.touch();
        self.events.record(DomainEvent::RolePermissionRemoved {
            role_id: self.id,
            permission_id,
        });

        Ok(())
    }

    /// Replace the whole permission set. Returns whether the set changed.
    pub fn set_permissions(
        &mut self,
        permission_ids: impl IntoIterator<Item = PermissionId>,
    ) -> Result<bool, DomainError> {
        self.ensure_modifiable()?;

        let next: BTreeSet<PermissionId> = permission_ids.into_iter().collect();
        if next == self.permission_ids {
            return Ok(false);
        }

        self.permission_ids = next;
        self.touch();
        self.events.record(DomainEvent::RolePermissionsChanged {
            role_id: self.id,
            permission_ids: self.permission_ids.iter().copied().collect(),
        });

        Ok(true)
    }

    /// Check the deletion guards owned by the role and record `RoleDeleted`.
    ///
    /// The "assigned to users" guard needs the user repository and lives in
    /// the command handler.
    pub fn delete(&mut self) -> Result<(), DomainError> {
        if self.is_system {
            return Err(Violation::SystemRoleImmutable.into());
        }
        if self.is_default {
            return Err(Violation::DefaultRoleNotDeletable.into());
        }

        self.events.record(DomainEvent::RoleDeleted {
            role_id: self.id,
            name: self.name.clone(),
        });

        Ok(())
    }

    /// Fail with `SystemRoleImmutable` for system roles
    pub fn ensure_modifiable(&self) -> Result<(), DomainError> {
        if self.is_system {
            return Err(Violation::SystemRoleImmutable.into());
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

    fn editor() -> Role {
        let mut role = Role::new(NewRoleParams::new("editor", "Editor")).unwrap();
        role.clear_events();
        role
    }

    fn system_role() -> Role {
        Role::new(NewRoleParams::new("admin", "Administrator").as_system()).unwrap()
    }

    #[test]
    fn test_new_role() {
        let p1 = PermissionId::new();
        let role = Role::new(
            NewRoleParams::new(" Editor ", "Content editor")
                .with_description("Edits content")
                .with_permissions(vec![p1, p1])
                .with_priority(10),
        )
        .unwrap();

        assert_eq!(role.name(), "editor");
        assert_eq!(role.display_name(), "Content editor");
        assert_eq!(role.priority(), 10);
        assert_eq!(role.permission_ids().len(), 1);
        assert!(role.can_be_modified());
        assert!(role.can_be_deleted());
        assert_eq!(role.domain_events().len(), 1);
        assert_eq!(role.domain_events()[0].event_type(), "role.created");
    }

    #[test]
    fn test_new_role_requires_names() {
        assert!(Role::new(NewRoleParams::new("", "Editor")).is_err());
        assert!(Role::new(NewRoleParams::new("editor", "  ")).is_err());
    }

    #[test]
    fn test_add_permission_twice_fails() {
        let mut role = editor();
        let p1 = PermissionId::new();

        role.add_permission(p1).unwrap();
        let err = role.add_permission(p1).unwrap_err();

        assert_eq!(err.violation(), Some(Violation::PermissionAlreadyAssigned));
        assert_eq!(role.permission_ids().len(), 1);
        assert_eq!(role.domain_events().len(), 1);
    }

    #[test]
    fn test_remove_permission() {
        let mut role = editor();
        let p1 = PermissionId::new();
        role.add_permission(p1).unwrap();

        role.remove_permission(p1).unwrap();
        assert!(!role.has_permission(p1));

        let err = role.remove_permission(p1).unwrap_err();
        assert_eq!(err.violation(), Some(Violation::PermissionNotAssigned));
    }

    #[test]
    fn test_set_permissions_replaces_and_is_idempotent() {
        let mut role = editor();
        let (p1, p2) = (PermissionId::new(), PermissionId::new());
        role.add_permission(p1).unwrap();
        role.clear_events();

        assert!(role.set_permissions([p2]).unwrap());
        assert!(!role.has_permission(p1));
        assert!(role.has_permission(p2));

        assert!(!role.set_permissions([p2]).unwrap());
        assert_eq!(role.domain_events().len(), 1);

        assert!(role.set_permissions([]).unwrap());
        assert!(role.permission_ids().is_empty());
    }

    #[test]
    fn test_system_role_rejects_every_mutation() {
        let mut role = system_role();
        let p1 = PermissionId::new();

        let results = vec![
            role.update_details(RoleDetailsUpdate {
                display_name: Some("Root".into()),
                ..Default::default()
            }),
            role.add_permission(p1),
            role.remove_permission(p1),
            role.set_permissions([p1]).map(|_| ()),
            role.delete(),
        ];

        for result in results {
            assert_eq!(
                result.unwrap_err().violation(),
                Some(Violation::SystemRoleImmutable)
            );
        }
        assert!(!role.can_be_modified());
        assert!(!role.can_be_deleted());
    }

    #[test]
    fn test_default_role_is_editable_but_not_deletable() {
        let mut role = Role::new(NewRoleParams::new("member", "Member").as_default()).unwrap();

        role.update_details(RoleDetailsUpdate {
            description: Some("Everyone".into()),
            ..Default::default()
        })
        .unwrap();
        role.add_permission(PermissionId::new()).unwrap();

        let err = role.delete().unwrap_err();
        assert_eq!(err.violation(), Some(Violation::DefaultRoleNotDeletable));
    }

    #[test]
    fn test_update_details_partial() {
        let mut role = editor();

        role.update_details(RoleDetailsUpdate {
            priority: Some(5),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(role.display_name(), "Editor");
        assert_eq!(role.priority(), 5);
        assert_eq!(role.domain_events()[0].event_type(), "role.updated");
    }

    #[test]
    fn test_update_details_validates_before_mutating() {
        let mut role = editor();

        let err = role
            .update_details(RoleDetailsUpdate {
                display_name: Some(String::new()),
                priority: Some(99),
                ..Default::default()
            })
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation { .. }));
        assert_eq!(role.priority(), 0);
        assert!(role.domain_events().is_empty());
    }

    #[test]
    fn test_delete_records_event() {
        let mut role = editor();
        role.delete().unwrap();
        assert_eq!(role.domain_events()[0].event_type(), "role.deleted");
    }

    #[test]
    fn test_reconstruct_roundtrip_has_no_events() {
        let role = editor();
        let rebuilt = Role::reconstruct(role.to_snapshot());
        assert_eq!(rebuilt.to_snapshot(), role.to_snapshot());
        assert!(rebuilt.domain_events().is_empty());
    }
}
