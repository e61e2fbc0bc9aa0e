//! Map a signed-in Discord account onto a dashboard role.

use {
    botdeck_channels::{PERMISSIONS, Role, UserStore},
    serde::Serialize,
    tracing::debug,
};

/// What a signed-in account may do on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Access {
    pub role: Role,
    pub permissions: Vec<String>,
}

impl Access {
    fn owner() -> Self {
        Self {
            role: Role::Owner,
            permissions: PERMISSIONS.iter().map(|p| p.id.to_string()).collect(),
        }
    }

    #[must_use]
    pub fn allows(&self, permission: &str) -> bool {
        botdeck_channels::permissions::allows(self.role, &self.permissions, permission)
    }
}

/// Resolve the role for `discord_id`.
///
/// The configured owner always gets every permission. Other accounts need a
/// record in the user store; `None` means the dashboard should refuse them.
pub async fn resolve_access(
    owner_id: Option<&str>,
    users: &dyn UserStore,
    discord_id: &str,
) -> anyhow::Result<Option<Access>> {
    if owner_id.is_some_and(|owner| owner == discord_id) {
        return Ok(Some(Access::owner()));
    }
    let Some(user) = users.find_by_discord_id(discord_id).await? else {
        debug!(discord_id, "no dashboard user for discord account");
        return Ok(None);
    };
    if user.role == Role::Owner {
        return Ok(Some(Access::owner()));
    }
    Ok(Some(Access {
        role: user.role,
        permissions: user.permissions,
    }))
}
