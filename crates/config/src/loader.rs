use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::BotdeckConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "botdeck.toml",
    "botdeck.yaml",
    "botdeck.yml",
    "botdeck.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<BotdeckConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config, then apply `BOTDECK_*` environment overrides.
///
/// Search order:
/// 1. `dir_override/botdeck.*` when a directory is given (and nothing else)
/// 2. `./botdeck.{toml,yaml,yml,json}` (project-local)
/// 3. `~/.config/botdeck/botdeck.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `BotdeckConfig::default()` if no file is found or the file
/// fails to parse.
pub fn discover_and_load(dir_override: Option<&Path>) -> BotdeckConfig {
    let mut config = match find_config_file(dir_override) {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            match load_config(&path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                    BotdeckConfig::default()
                },
            }
        },
        None => {
            debug!("no config file found, using defaults");
            BotdeckConfig::default()
        },
    };
    apply_env_overrides(&mut config);
    config
}

/// Find the first config file in standard locations.
pub fn find_config_file(dir_override: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = dir_override {
        return first_existing(dir);
    }

    first_existing(Path::new(".")).or_else(|| config_dir().and_then(|dir| first_existing(&dir)))
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/botdeck/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "botdeck").map(|d| d.config_dir().to_path_buf())
}

/// Apply `BOTDECK_*` environment variables on top of a loaded config.
///
/// The OAuth client secret and bot token are typically injected this way so
/// they never land in a config file.
pub fn apply_env_overrides(config: &mut BotdeckConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut BotdeckConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(bind) = get("BOTDECK_BIND") {
        config.server.bind = bind;
    }
    if let Some(port) = get("BOTDECK_PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(e) => warn!(value = %port, error = %e, "ignoring invalid BOTDECK_PORT"),
        }
    }
    if let Some(id) = get("BOTDECK_DISCORD_CLIENT_ID") {
        config.oauth.client_id = Some(id);
    }
    if let Some(secret) = get("BOTDECK_DISCORD_CLIENT_SECRET") {
        config.oauth.client_secret = Some(Secret::new(secret));
    }
    if let Some(uri) = get("BOTDECK_DISCORD_REDIRECT_URI") {
        config.oauth.redirect_uri = Some(uri);
    }
    if let Some(owner) = get("BOTDECK_OWNER_DISCORD_ID") {
        config.oauth.owner_id = Some(owner);
    }
    if let Some(token) = get("BOTDECK_BOT_TOKEN") {
        config.bot.token = Some(Secret::new(token));
    }
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<BotdeckConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn loads_yaml_from_override_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("botdeck.yaml"),
            "server:\n  port: 8123\nbot:\n  prefix: \"$\"\n",
        )
        .unwrap();

        let path = find_config_file(Some(dir.path())).unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.port, 8123);
        assert_eq!(cfg.bot.prefix, "$");
    }

    #[test]
    fn toml_wins_over_json_in_same_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("botdeck.json"), "{}").unwrap();
        std::fs::write(dir.path().join("botdeck.toml"), "").unwrap();
        let path = find_config_file(Some(dir.path())).unwrap();
        assert!(path.ends_with("botdeck.toml"));
    }

    #[test]
    fn override_dir_without_file_finds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_config_file(Some(dir.path())).is_none());
    }

    #[test]
    fn unsupported_extension_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("botdeck.ini");
        std::fs::write(&path, "x=1").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("botdeck.toml"), "server = [").unwrap();
        let cfg = discover_and_load(Some(dir.path()));
        assert_eq!(cfg.server.bind, "127.0.0.1");
    }

    #[test]
    fn env_overrides_apply_and_skip_invalid_port() {
        let mut cfg = BotdeckConfig::default();
        apply_env_overrides_with(&mut cfg, |name| match name {
            "BOTDECK_PORT" => Some("not-a-port".into()),
            "BOTDECK_DISCORD_CLIENT_ID" => Some("1234".into()),
            "BOTDECK_DISCORD_CLIENT_SECRET" => Some("s3cret".into()),
            "BOTDECK_BOT_TOKEN" => Some("  ".into()),
            _ => None,
        });
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.oauth.client_id.as_deref(), Some("1234"));
        assert_eq!(
            cfg.oauth.client_secret.as_ref().unwrap().expose_secret(),
            "s3cret"
        );
        assert!(cfg.bot.token.is_none());
    }
}
