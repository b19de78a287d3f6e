//! Bootstrap command - seeds the catalog and reports what exists

use tracing::info;

use crate::domain::UserQuery;

pub async fn run() -> anyhow::Result<()> {
    let config = super::load_config()?;
    let state = crate::create_app_state_with_config(&config).await?;

    let permissions = state.permissions.find_all().await?;
    let roles = state.roles.find_all().await?;
    let users = state.users.count(&UserQuery::new()).await?;

    for role in &roles {
        info!(
            name = %role.name(),
            system = role.is_system(),
            default = role.is_default(),
            permissions = role.permission_ids().len(),
            "Role"
        );
    }

    info!(
        permissions = permissions.len(),
        roles = roles.len(),
        users,
        "Bootstrap complete"
    );

    Ok(())
}
