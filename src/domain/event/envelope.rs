//! Domain event payloads and the per-aggregate pending buffer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::id::{PermissionId, RoleId, UserId};
use crate::domain::user::UserStatus;

/// A fact about a past state change of one aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    UserCreated {
        user_id: UserId,
        email: String,
        status: UserStatus,
    },
    UserProfileUpdated {
        user_id: UserId,
        full_name: String,
    },
    UserPasswordChanged {
        user_id: UserId,
    },
    UserActivated {
        user_id: UserId,
        previous_status: UserStatus,
    },
    UserDeactivated {
        user_id: UserId,
    },
    UserBanned {
        user_id: UserId,
        reason: String,
    },
    UserRoleAssigned {
        user_id: UserId,
        role_id: RoleId,
    },
    UserRoleRevoked {
        user_id: UserId,
        role_id: RoleId,
    },
    UserRolesChanged {
        user_id: UserId,
        role_ids: Vec<RoleId>,
    },
    UserDeleted {
        user_id: UserId,
    },
    RoleCreated {
        role_id: RoleId,
        name: String,
    },
    RoleUpdated {
        role_id: RoleId,
    },
    RolePermissionAssigned {
        role_id: RoleId,
        permission_id: PermissionId,
    },
    RolePermissionRemoved {
        role_id: RoleId,
        permission_id: PermissionId,
    },
    RolePermissionsChanged {
        role_id: RoleId,
        permission_ids: Vec<PermissionId>,
    },
    RoleDeleted {
        role_id: RoleId,
        name: String,
    },
    PermissionCreated {
        permission_id: PermissionId,
        code: String,
    },
    PermissionUpdated {
        permission_id: PermissionId,
    },
    PermissionDeleted {
        permission_id: PermissionId,
        code: String,
    },
}

impl DomainEvent {
    /// Stable event name used for routing
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::UserCreated { .. } => "user.created",
            Self::UserProfileUpdated { .. } => "user.profile_updated",
            Self::UserPasswordChanged { .. } => "user.password_changed",
            Self::UserActivated { .. } => "user.activated",
            Self::UserDeactivated { .. } => "user.deactivated",
            Self::UserBanned { .. } => "user.banned",
            Self::UserRoleAssigned { .. } => "user.role_assigned",
            Self::UserRoleRevoked { .. } => "user.role_revoked",
            Self::UserRolesChanged { .. } => "user.roles_changed",
            Self::UserDeleted { .. } => "user.deleted",
            Self::RoleCreated { .. } => "role.created",
            Self::RoleUpdated { .. } => "role.updated",
            Self::RolePermissionAssigned { .. } => "role.permission_assigned",
            Self::RolePermissionRemoved { .. } => "role.permission_removed",
            Self::RolePermissionsChanged { .. } => "role.permissions_changed",
            Self::RoleDeleted { .. } => "role.deleted",
            Self::PermissionCreated { .. } => "permission.created",
            Self::PermissionUpdated { .. } => "permission.updated",
            Self::PermissionDeleted { .. } => "permission.deleted",
        }
    }

    /// Kind of aggregate the event belongs to
    pub fn aggregate_type(&self) -> &'static str {
        match self.event_type().split_once('.') {
            Some((aggregate, _)) => aggregate,
            None => "unknown",
        }
    }

    /// Identifier of the aggregate the event belongs to
    pub fn aggregate_id(&self) -> String {
        match self {
            Self::UserCreated { user_id, .. }
            | Self::UserProfileUpdated { user_id, .. }
            | Self::UserPasswordChanged { user_id }
            | Self::UserActivated { user_id, .. }
            | Self::UserDeactivated { user_id }
            | Self::UserBanned { user_id, .. }
            | Self::UserRoleAssigned { user_id, .. }
            | Self::UserRoleRevoked { user_id, .. }
            | Self::UserRolesChanged { user_id, .. }
            | Self::UserDeleted { user_id } => user_id.to_string(),
            Self::RoleCreated { role_id, .. }
            | Self::RoleUpdated { role_id }
            | Self::RolePermissionAssigned { role_id, .. }
            | Self::RolePermissionRemoved { role_id, .. }
            | Self::RolePermissionsChanged { role_id, .. }
            | Self::RoleDeleted { role_id, .. } => role_id.to_string(),
            Self::PermissionCreated { permission_id, .. }
            | Self::PermissionUpdated { permission_id }
            | Self::PermissionDeleted { permission_id, .. } => permission_id.to_string(),
        }
    }
}

/// Event plus delivery metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub event: DomainEvent,
}

impl EventEnvelope {
    pub fn new(event: DomainEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            event,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }
}

/// Ordered buffer of events not yet handed to the bus.
///
/// Owned by a single aggregate instance; never persisted.
#[derive(Debug, Clone, Default)]
pub struct EventBuffer {
    pending: Vec<EventEnvelope>,
}

impl EventBuffer {
    pub fn record(&mut self, event: DomainEvent) {
        self.pending.push(EventEnvelope::new(event));
    }

    pub fn as_slice(&self) -> &[EventEnvelope] {
        &self.pending
    }

    /// Return all pending events and leave the buffer empty
    pub fn take(&mut self) -> Vec<EventEnvelope> {
        std::mem::take(&mut self.pending)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
