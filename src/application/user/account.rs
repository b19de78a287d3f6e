//! Account creation shared by CreateUser and Register

use std::collections::BTreeSet;

use crate::domain::auth::PasswordHasher;
use crate::domain::user::validate_password;
use crate::domain::{DomainError, Email, ResultExt, RoleId, RoleRepository, User, UserRepository};

/// Input for [`create_account`]
#[derive(Debug, Clone)]
pub(crate) struct NewAccount {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role_ids: Vec<RoleId>,
    pub activate: bool,
}

/// Fail with `NotFound` unless every role ID exists
pub(crate) async fn ensure_roles_exist(
    roles: &dyn RoleRepository,
    role_ids: &[RoleId],
) -> Result<(), DomainError> {
    let unique: Vec<RoleId> = role_ids
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if unique.is_empty() {
        return Ok(());
    }

    let found = roles.find_by_ids(&unique).await.context("load roles")?;
    if found.len() != unique.len() {
        let missing: Vec<String> = unique
            .iter()
            .filter(|id| !found.iter().any(|r| r.id() == **id))
            .map(|id| id.to_string())
            .collect();
        return Err(DomainError::not_found(format!(
            "Role(s) not found: {}",
            missing.join(", ")
        )));
    }

    Ok(())
}

/// Validate, build and persist a new user.
///
/// Everything that can be rejected is checked before the repository is
/// touched. The returned user still holds its pending events.
pub(crate) async fn create_account(
    users: &dyn UserRepository,
    roles: &dyn RoleRepository,
    hasher: &dyn PasswordHasher,
    account: NewAccount,
) -> Result<User, DomainError> {
    let email = Email::parse(&account.email)?;
    validate_password(&account.password)?;

    if users
        .find_by_email(&email)
        .await
        .context("find user by email")?
        .is_some()
    {
        return Err(DomainError::already_exists(format!(
            "User with email '{}' already exists",
            email
        )));
    }

    ensure_roles_exist(roles, &account.role_ids).await?;

    let password_hash = hasher.hash(&account.password)?;
    let mut user = User::new(email, password_hash, account.full_name)?;

    for role_id in account.role_ids.iter().copied().collect::<BTreeSet<_>>() {
        user.assign_role(role_id)?;
    }

    if account.activate {
        user.activate()?;
    }

    users.create(&user).await.context("create user")?;

    Ok(user)
}
