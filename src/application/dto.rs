//! Plain data returned by command and query handlers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Permission, Role, Session, SessionId, User};

/// User as exposed to callers; never carries the password hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ban_reason: Option<String>,
    pub role_ids: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().into(),
            email: user.email().to_string(),
            full_name: user.full_name().to_string(),
            status: user.status().to_string(),
            ban_reason: user.ban_reason().map(str::to_string),
            role_ids: user.role_ids().iter().map(|id| (*id).into()).collect(),
            last_login_at: user.last_login_at(),
            created_at: user.created_at(),
            updated_at: user.updated_at(),
        }
    }
}

/// One page of users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserListDto {
    pub users: Vec<UserDto>,
    pub total: usize,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDto {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub permission_ids: Vec<Uuid>,
    pub is_system: bool,
    pub is_default: bool,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Role> for RoleDto {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id().into(),
            name: role.name().to_string(),
            display_name: role.display_name().to_string(),
            description: role.description().to_string(),
            permission_ids: role.permission_ids().iter().map(|id| (*id).into()).collect(),
            is_system: role.is_system(),
            is_default: role.is_default(),
            priority: role.priority(),
            created_at: role.created_at(),
            updated_at: role.updated_at(),
        }
    }
}

/// Role together with its resolved permissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDetailDto {
    #[serde(flatten)]
    pub role: RoleDto,
    pub permissions: Vec<PermissionDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionDto {
    pub id: Uuid,
    pub resource: String,
    pub action: String,
    pub code: String,
    pub description: String,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Permission> for PermissionDto {
    fn from(permission: &Permission) -> Self {
        Self {
            id: permission.id().into(),
            resource: permission.resource().to_string(),
            action: permission.action().to_string(),
            code: permission.code().to_string(),
            description: permission.description().to_string(),
            is_system: permission.is_system(),
            created_at: permission.created_at(),
            updated_at: permission.updated_at(),
        }
    }
}

/// Result of a permission check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCheckDto {
    pub user_id: Uuid,
    pub permission: String,
    pub granted: bool,
    /// Code of the held permission that granted the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granted_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDto {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Whether this is the session the caller is using
    pub current: bool,
}

impl SessionDto {
    pub fn from_session(session: &Session, current: Option<SessionId>) -> Self {
        Self {
            id: session.id.into(),
            user_agent: session.client.user_agent.clone(),
            ip_address: session.client.ip_address.clone(),
            created_at: session.created_at,
            last_used_at: session.last_used_at,
            expires_at: session.expires_at,
            current: current == Some(session.id),
        }
    }
}

/// A freshly issued access/refresh token pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokensDto {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Expiry of the access token
    pub expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub session_id: Uuid,
}

/// Returned by Register and Login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponseDto {
    pub user: UserDto,
    #[serde(flatten)]
    pub tokens: AuthTokensDto,
}

/// The caller identified by a valid access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalDto {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub email: String,
    pub role_ids: Vec<Uuid>,
    pub expires_at: DateTime<Utc>,
}

/// Generic acknowledgement for flows that must not reveal details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    pub message: String,
}

impl MessageDto {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Count of records affected by a bulk operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountDto {
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClientInfo, Email, UserId};
    use chrono::Duration;

    #[test]
    fn test_user_dto_hides_hash() {
        let user = User::new(Email::parse("dto@example.com").unwrap(), "secret-hash", "Dto").unwrap();
        let dto = UserDto::from(&user);

        assert_eq!(dto.status, "pending");
        let json = serde_json::to_string(&dto).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("ban_reason"));
    }

    #[test]
    fn test_session_dto_marks_current() {
        let session = Session::new(UserId::new(), "h", ClientInfo::default(), Duration::days(1));

        assert!(SessionDto::from_session(&session, Some(session.id)).current);
        assert!(!SessionDto::from_session(&session, None).current);
    }
}
