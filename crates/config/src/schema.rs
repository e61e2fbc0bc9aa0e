//! Config schema types (server, oauth, bot defaults, lifecycle, discord,
//! metrics, logs).

use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotdeckConfig {
    pub server: ServerConfig,
    pub oauth: OAuthSettings,
    pub bot: BotDefaults,
    pub lifecycle: LifecycleConfig,
    pub discord: DiscordConfig,
    pub metrics: MetricsConfig,
    pub logs: LogsConfig,
}

/// Dashboard HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

/// Discord OAuth2 application used to sign operators in.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSettings {
    pub client_id: Option<String>,
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_secret: Option<Secret<String>>,
    /// Fixed redirect URI. When unset, `{origin}/auth/callback` is derived
    /// from the requesting origin.
    pub redirect_uri: Option<String>,
    pub scopes: Vec<String>,
    pub authorize_url: String,
    pub token_url: String,
    /// Base URL for `/users/@me` lookups.
    pub api_base: String,
    /// Discord user id that is always granted the owner role.
    pub owner_id: Option<String>,
}

impl std::fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("owner_id", &self.owner_id)
            .finish_non_exhaustive()
    }
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            scopes: vec!["identify".into(), "email".into(), "guilds".into()],
            authorize_url: "https://discord.com/api/oauth2/authorize".into(),
            token_url: "https://discord.com/api/oauth2/token".into(),
            api_base: "https://discord.com/api".into(),
            owner_id: None,
        }
    }
}

/// Defaults for the bot configuration the dashboard edits.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotDefaults {
    /// Presence name shown as "Watching {name}".
    pub name: String,
    pub prefix: String,
    pub application_id: Option<String>,
    /// Optional stored token so `start` can be issued without re-entering it.
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub token: Option<Secret<String>>,
}

impl std::fmt::Debug for BotDefaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotDefaults")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("application_id", &self.application_id)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for BotDefaults {
    fn default() -> Self {
        Self {
            name: "Bot Management Panel".into(),
            prefix: "!".into(),
            application_id: None,
            token: None,
        }
    }
}

/// One entry of the connection retry plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryAttemptConfig {
    pub label: String,
    pub timeout_ms: u64,
}

impl RetryAttemptConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Connection lifecycle tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Attempts tried strictly in order until one connects.
    pub retry_plan: Vec<RetryAttemptConfig>,
    /// How long the background readiness tracker waits before marking the
    /// connection degraded.
    pub readiness_timeout_secs: u64,
}

impl LifecycleConfig {
    #[must_use]
    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_secs)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            retry_plan: vec![
                RetryAttemptConfig {
                    label: "quick".into(),
                    timeout_ms: 5_000,
                },
                RetryAttemptConfig {
                    label: "standard".into(),
                    timeout_ms: 10_000,
                },
                RetryAttemptConfig {
                    label: "extended".into(),
                    timeout_ms: 15_000,
                },
            ],
            readiness_timeout_secs: 20,
        }
    }
}

/// Gateway intents the bot identifies with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GatewayIntent {
    Guilds,
    GuildMembers,
    GuildMessages,
    DirectMessages,
    MessageContent,
}

/// Gateway identify options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub intents: Vec<GatewayIntent>,
    /// How long to wait for guilds announced in READY before declaring the
    /// session ready anyway.
    pub guild_wait_secs: u64,
}

impl DiscordConfig {
    #[must_use]
    pub fn guild_wait(&self) -> Duration {
        Duration::from_secs(self.guild_wait_secs)
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            intents: vec![
                GatewayIntent::Guilds,
                GatewayIntent::GuildMessages,
                GatewayIntent::MessageContent,
            ],
            guild_wait_secs: 15,
        }
    }
}

/// Metrics collection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// In-memory log capture for the dashboard log view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogsConfig {
    pub capacity: usize,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self { capacity: 2_000 }
    }
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
