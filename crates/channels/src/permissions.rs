//! Dashboard roles and the permission catalogue.

use serde::{Deserialize, Serialize};

/// Dashboard role. Owners implicitly hold every permission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Staff,
    #[default]
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionCategory {
    Bot,
    Users,
    Commands,
    Settings,
    Servers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Permission {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: PermissionCategory,
}

const fn perm(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    category: PermissionCategory,
) -> Permission {
    Permission {
        id,
        name,
        description,
        category,
    }
}

pub const PERMISSIONS: &[Permission] = &[
    perm("bot.start", "Start Bot", "Start the Discord bot", PermissionCategory::Bot),
    perm("bot.stop", "Stop Bot", "Stop the Discord bot", PermissionCategory::Bot),
    perm("bot.config", "Configure Bot", "Change bot settings", PermissionCategory::Bot),
    perm(
        "bot.token",
        "Manage Token",
        "View and update bot token",
        PermissionCategory::Bot,
    ),
    perm(
        "bot.status",
        "View Status",
        "View bot status and statistics",
        PermissionCategory::Bot,
    ),
    perm("users.view", "View Users", "View all users", PermissionCategory::Users),
    perm("users.add", "Add Users", "Add new users", PermissionCategory::Users),
    perm(
        "users.edit",
        "Edit Users",
        "Edit user permissions",
        PermissionCategory::Users,
    ),
    perm("users.remove", "Remove Users", "Remove users", PermissionCategory::Users),
    perm(
        "commands.view",
        "View Commands",
        "View bot commands",
        PermissionCategory::Commands,
    ),
    perm(
        "commands.create",
        "Create Commands",
        "Create new commands",
        PermissionCategory::Commands,
    ),
    perm(
        "commands.edit",
        "Edit Commands",
        "Edit existing commands",
        PermissionCategory::Commands,
    ),
    perm(
        "commands.delete",
        "Delete Commands",
        "Delete commands",
        PermissionCategory::Commands,
    ),
    perm(
        "servers.view",
        "View Servers",
        "View bot servers",
        PermissionCategory::Servers,
    ),
    perm(
        "servers.manage",
        "Manage Servers",
        "Manage bot servers",
        PermissionCategory::Servers,
    ),
    perm(
        "servers.leave",
        "Leave Servers",
        "Make bot leave servers",
        PermissionCategory::Servers,
    ),
    perm(
        "settings.view",
        "View Settings",
        "View system settings",
        PermissionCategory::Settings,
    ),
    perm(
        "settings.edit",
        "Edit Settings",
        "Edit system settings",
        PermissionCategory::Settings,
    ),
];

/// Look up a catalogue entry by id.
#[must_use]
pub fn find(id: &str) -> Option<&'static Permission> {
    PERMISSIONS.iter().find(|p| p.id == id)
}

/// Whether a user with `role` and explicit `granted` ids holds `permission`.
#[must_use]
pub fn allows(role: Role, granted: &[String], permission: &str) -> bool {
    role == Role::Owner || granted.iter().any(|g| g == permission)
}
