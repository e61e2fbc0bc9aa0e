//! Storage for the records the dashboard edits: users, commands and the
//! bot's display settings.
//!
//! Only in-memory implementations ship; the traits keep the HTTP layer
//! independent of where records live.

use {
    anyhow::Result,
    async_trait::async_trait,
    dashmap::DashMap,
    serde::{Deserialize, Serialize},
    tokio::sync::RwLock,
};

use crate::permissions::Role;

/// A command the dispatcher may route to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub usage: String,
    pub category: String,
    pub enabled: bool,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl CommandDefinition {
    fn builtin(id: &str, name: &str, description: &str, category: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            usage: format!("!{name}"),
            category: category.into(),
            enabled: true,
            permissions: Vec::new(),
        }
    }

    /// The commands the dispatcher has handlers for.
    #[must_use]
    pub fn builtins() -> Vec<Self> {
        vec![
            Self::builtin("1", "ping", "Check bot latency", "utility"),
            Self::builtin("2", "hello", "Greet the user", "fun"),
            Self::builtin("3", "test", "Test bot functionality", "utility"),
            Self::builtin("4", "info", "Show bot information", "utility"),
            Self::builtin("5", "help", "Show available commands", "utility"),
            Self::builtin("6", "status", "Show bot status", "utility"),
        ]
    }
}

/// A dashboard user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    pub id: String,
    pub username: String,
    pub discord_id: String,
    pub role: Role,
    pub avatar: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub created_at: i64,
    pub last_active: i64,
}

/// Non-secret bot settings applied on the next start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBotConfig {
    pub name: String,
    pub prefix: String,
    pub application_id: Option<String>,
}

#[async_trait]
pub trait CommandStore: Send + Sync {
    async fn list(&self) -> Result<Vec<CommandDefinition>>;
    async fn get(&self, id: &str) -> Result<Option<CommandDefinition>>;
    async fn upsert(&self, command: CommandDefinition) -> Result<()>;
    /// Returns `false` when nothing was stored under `id`.
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list(&self) -> Result<Vec<StoredUser>>;
    async fn get(&self, id: &str) -> Result<Option<StoredUser>>;
    async fn find_by_discord_id(&self, discord_id: &str) -> Result<Option<StoredUser>>;
    async fn upsert(&self, user: StoredUser) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait BotConfigStore: Send + Sync {
    async fn get(&self) -> Result<StoredBotConfig>;
    async fn put(&self, config: StoredBotConfig) -> Result<()>;
}

// ── In-memory implementations ───────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryCommandStore {
    commands: DashMap<String, CommandDefinition>,
}

impl MemoryCommandStore {
    /// Store pre-populated with [`CommandDefinition::builtins`].
    #[must_use]
    pub fn with_builtins() -> Self {
        let store = Self::default();
        for cmd in CommandDefinition::builtins() {
            store.commands.insert(cmd.id.clone(), cmd);
        }
        store
    }
}

#[async_trait]
impl CommandStore for MemoryCommandStore {
    async fn list(&self) -> Result<Vec<CommandDefinition>> {
        let mut out: Vec<_> = self.commands.iter().map(|e| e.value().clone()).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn get(&self, id: &str) -> Result<Option<CommandDefinition>> {
        Ok(self.commands.get(id).map(|e| e.value().clone()))
    }

    async fn upsert(&self, command: CommandDefinition) -> Result<()> {
        if command.name.trim().is_empty() {
            anyhow::bail!("command name must not be empty");
        }
        self.commands.insert(command.id.clone(), command);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.commands.remove(id).is_some())
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<String, StoredUser>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list(&self) -> Result<Vec<StoredUser>> {
        let mut out: Vec<_> = self.users.iter().map(|e| e.value().clone()).collect();
        out.sort_by_key(|u| u.created_at);
        Ok(out)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredUser>> {
        Ok(self.users.get(id).map(|e| e.value().clone()))
    }

    async fn find_by_discord_id(&self, discord_id: &str) -> Result<Option<StoredUser>> {
        Ok(self
            .users
            .iter()
            .find(|e| e.value().discord_id == discord_id)
            .map(|e| e.value().clone()))
    }

    async fn upsert(&self, user: StoredUser) -> Result<()> {
        self.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.users.remove(id).is_some())
    }
}

pub struct MemoryBotConfigStore {
    config: RwLock<StoredBotConfig>,
}

impl MemoryBotConfigStore {
    #[must_use]
    pub fn new(initial: StoredBotConfig) -> Self {
        Self {
            config: RwLock::new(initial),
        }
    }
}

#[async_trait]
impl BotConfigStore for MemoryBotConfigStore {
    async fn get(&self) -> Result<StoredBotConfig> {
        Ok(self.config.read().await.clone())
    }

    async fn put(&self, config: StoredBotConfig) -> Result<()> {
        if config.prefix.trim().is_empty() {
            anyhow::bail!("prefix must not be empty");
        }
        *self.config.write().await = config;
        Ok(())
    }
}
