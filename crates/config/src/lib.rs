//! Configuration loading, validation and env substitution.
//!
//! Config files: `botdeck.toml`, `botdeck.yaml` or `botdeck.json`,
//! searched in `./` then `~/.config/botdeck/` (or an explicit directory).
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution in the raw
//! file before parsing.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, find_config_file, load_config},
    schema::{
        BotDefaults, BotdeckConfig, DiscordConfig, GatewayIntent, LifecycleConfig, LogsConfig,
        MetricsConfig, OAuthSettings, RetryAttemptConfig, ServerConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult},
};
