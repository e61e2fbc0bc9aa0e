//! Configuration validation.
//!
//! Checks a TOML config file against the known schema, flags unknown or
//! misspelled fields, and reports settings that would make the bot
//! lifecycle misbehave.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::schema::BotdeckConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "lifecycle",
    /// "oauth", "security", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "lifecycle.retry_plan[0].timeout_ms"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Array(Box<KnownKeys>),
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Array, Leaf, Struct};

    Struct(HashMap::from([
        (
            "server",
            Struct(HashMap::from([("bind", Leaf), ("port", Leaf)])),
        ),
        (
            "oauth",
            Struct(HashMap::from([
                ("client_id", Leaf),
                ("client_secret", Leaf),
                ("redirect_uri", Leaf),
                ("scopes", Leaf),
                ("authorize_url", Leaf),
                ("token_url", Leaf),
                ("api_base", Leaf),
                ("owner_id", Leaf),
            ])),
        ),
        (
            "bot",
            Struct(HashMap::from([
                ("name", Leaf),
                ("prefix", Leaf),
                ("application_id", Leaf),
                ("token", Leaf),
            ])),
        ),
        (
            "lifecycle",
            Struct(HashMap::from([
                (
                    "retry_plan",
                    Array(Box::new(Struct(HashMap::from([
                        ("label", Leaf),
                        ("timeout_ms", Leaf),
                    ])))),
                ),
                ("readiness_timeout_secs", Leaf),
            ])),
        ),
        (
            "discord",
            Struct(HashMap::from([
                ("intents", Leaf),
                ("guild_wait_secs", Leaf),
            ])),
        ),
        ("metrics", Struct(HashMap::from([("enabled", Leaf)]))),
        ("logs", Struct(HashMap::from([("capacity", Leaf)]))),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(None),
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    if actual_path.extension().and_then(|e| e.to_str()) != Some("toml") {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "only TOML files are checked field by field".into(),
            }],
            config_path: Some(actual_path.clone()),
        };
    }

    match std::fs::read_to_string(actual_path) {
        Ok(content) => {
            let mut result = validate_toml_str(&content);
            result.config_path = Some(actual_path.clone());
            result
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to read config file: {e}"),
            }],
            config_path: Some(actual_path.clone()),
        },
    }
}

/// Validate a TOML string without touching the file system.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let toml_value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("TOML syntax error: {e}"),
            });
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&toml_value, &build_schema_map(), "", &mut diagnostics);

    match toml::from_str::<BotdeckConfig>(toml_str) {
        Ok(config) => check_semantic_warnings(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match (value, schema) {
        (toml::Value::Table(table), KnownKeys::Struct(fields)) => {
            let known_keys: Vec<&str> = fields.keys().copied().collect();
            for (key, child_value) in table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                if let Some(child_schema) = fields.get(key.as_str()) {
                    check_unknown_fields(child_value, child_schema, &path, diagnostics);
                    continue;
                }
                let level = if prefix.is_empty() {
                    " at top level"
                } else {
                    ""
                };
                let message = match suggest(key, &known_keys, 3) {
                    Some(s) => format!("unknown field{level} (did you mean \"{s}\"?)"),
                    None => format!("unknown field{level}"),
                };
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    category: "unknown-field",
                    path,
                    message,
                });
            }
        },
        (toml::Value::Array(arr), KnownKeys::Array(item_schema)) => {
            for (i, item) in arr.iter().enumerate() {
                let path = format!("{prefix}[{i}]");
                check_unknown_fields(item, item_schema, &path, diagnostics);
            }
        },
        _ => {},
    }
}

fn check_semantic_warnings(config: &BotdeckConfig, diagnostics: &mut Vec<Diagnostic>) {
    let lifecycle = &config.lifecycle;

    if lifecycle.retry_plan.is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "lifecycle",
            path: "lifecycle.retry_plan".into(),
            message: "retry plan is empty; the bot could never connect".into(),
        });
    }
    for (i, attempt) in lifecycle.retry_plan.iter().enumerate() {
        if attempt.timeout_ms == 0 {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "lifecycle",
                path: format!("lifecycle.retry_plan[{i}].timeout_ms"),
                message: format!("attempt \"{}\" has a zero timeout", attempt.label),
            });
        }
    }
    if let Some(pair) = lifecycle
        .retry_plan
        .windows(2)
        .find(|w| w[1].timeout_ms < w[0].timeout_ms)
    {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "lifecycle",
            path: "lifecycle.retry_plan".into(),
            message: format!(
                "attempt \"{}\" is shorter than the attempt before it",
                pair[1].label
            ),
        });
    }
    if lifecycle.readiness_timeout_secs == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "lifecycle",
            path: "lifecycle.readiness_timeout_secs".into(),
            message: "readiness timeout must be greater than zero".into(),
        });
    }

    if config.bot.prefix.trim().is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "lifecycle",
            path: "bot.prefix".into(),
            message: "command prefix must not be empty".into(),
        });
    }

    if config.discord.intents.is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "lifecycle",
            path: "discord.intents".into(),
            message: "no gateway intents configured; no messages will be received".into(),
        });
    }

    if config.oauth.client_id.is_none() || config.oauth.client_secret.is_none() {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "oauth",
            path: "oauth".into(),
            message: "Discord OAuth client is not configured; dashboard sign-in is disabled"
                .into(),
        });
    }

    if config.bot.token.is_some() {
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            category: "security",
            path: "bot.token".into(),
            message: "bot token stored in config; prefer BOTDECK_BOT_TOKEN".into(),
        });
    }

    let is_localhost = matches!(
        config.server.bind.as_str(),
        "127.0.0.1" | "localhost" | "::1"
    );
    if !is_localhost {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "security",
            path: "server.bind".into(),
            message: format!(
                "dashboard API is exposed on {} without authentication",
                config.server.bind
            ),
        });
    }
}
