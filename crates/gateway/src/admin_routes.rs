//! Dashboard record editing: commands, users and the permission catalogue.

use {
    axum::{
        Json, Router,
        extract::{Path, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::get,
    },
    botdeck_channels::{CommandDefinition, PERMISSIONS, Role, StoredUser},
    serde::Deserialize,
    serde_json::json,
};

use crate::server::AppState;

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/commands", get(list_commands).post(create_command))
        .route(
            "/commands/{id}",
            get(get_command).put(update_command).delete(delete_command),
        )
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/permissions", get(list_permissions))
}

fn store_error(status: StatusCode, e: anyhow::Error) -> Response {
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("{what} not found") })),
    )
        .into_response()
}

// ── Commands ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandInput {
    name: String,
    #[serde(default)]
    description: String,
    usage: Option<String>,
    #[serde(default = "default_category")]
    category: String,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default)]
    permissions: Vec<String>,
}

fn default_category() -> String {
    "custom".into()
}

fn default_true() -> bool {
    true
}

impl CommandInput {
    fn into_definition(self, id: String) -> CommandDefinition {
        let name = self.name.trim().to_lowercase();
        CommandDefinition {
            usage: self.usage.unwrap_or_else(|| format!("!{name}")),
            id,
            name,
            description: self.description,
            category: self.category,
            enabled: self.enabled,
            permissions: self.permissions,
        }
    }
}

async fn list_commands(State(state): State<AppState>) -> Response {
    match state.gateway.commands.list().await {
        Ok(commands) => Json(commands).into_response(),
        Err(e) => store_error(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

async fn get_command(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.gateway.commands.get(&id).await {
        Ok(Some(cmd)) => Json(cmd).into_response(),
        Ok(None) => not_found("command"),
        Err(e) => store_error(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

async fn create_command(
    State(state): State<AppState>,
    Json(input): Json<CommandInput>,
) -> Response {
    let cmd = input.into_definition(uuid::Uuid::new_v4().to_string());
    match state.gateway.commands.upsert(cmd.clone()).await {
        Ok(()) => (StatusCode::CREATED, Json(cmd)).into_response(),
        Err(e) => store_error(StatusCode::BAD_REQUEST, e),
    }
}

async fn update_command(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CommandInput>,
) -> Response {
    let commands = &state.gateway.commands;
    match commands.get(&id).await {
        Ok(Some(_)) => {},
        Ok(None) => return not_found("command"),
        Err(e) => return store_error(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
    let cmd = input.into_definition(id);
    match commands.upsert(cmd.clone()).await {
        Ok(()) => Json(cmd).into_response(),
        Err(e) => store_error(StatusCode::BAD_REQUEST, e),
    }
}

async fn delete_command(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.gateway.commands.delete(&id).await {
        Ok(true) => Json(json!({ "success": true })).into_response(),
        Ok(false) => not_found("command"),
        Err(e) => store_error(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

// ── Users ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserInput {
    username: String,
    discord_id: String,
    #[serde(default)]
    role: Role,
    avatar: Option<String>,
    #[serde(default)]
    permissions: Vec<String>,
}

fn unknown_permissions(granted: &[String]) -> Vec<&str> {
    granted
        .iter()
        .map(String::as_str)
        .filter(|id| botdeck_channels::permissions::find(id).is_none())
        .collect()
}

async fn list_users(State(state): State<AppState>) -> Response {
    match state.gateway.users.list().await {
        Ok(users) => Json(users).into_response(),
        Err(e) => store_error(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.gateway.users.get(&id).await {
        Ok(Some(user)) => Json(user).into_response(),
        Ok(None) => not_found("user"),
        Err(e) => store_error(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

async fn create_user(State(state): State<AppState>, Json(input): Json<UserInput>) -> Response {
    let unknown = unknown_permissions(&input.permissions);
    if !unknown.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Unknown permissions", "details": unknown })),
        )
            .into_response();
    }
    let now = botdeck_common::time::unix_now();
    let user = StoredUser {
        id: uuid::Uuid::new_v4().to_string(),
        username: input.username,
        discord_id: input.discord_id,
        role: input.role,
        avatar: input.avatar,
        permissions: input.permissions,
        created_at: now,
        last_active: now,
    };
    match state.gateway.users.upsert(user.clone()).await {
        Ok(()) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(e) => store_error(StatusCode::BAD_REQUEST, e),
    }
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UserInput>,
) -> Response {
    let unknown = unknown_permissions(&input.permissions);
    if !unknown.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Unknown permissions", "details": unknown })),
        )
            .into_response();
    }
    let users = &state.gateway.users;
    let existing = match users.get(&id).await {
        Ok(Some(user)) => user,
        Ok(None) => return not_found("user"),
        Err(e) => return store_error(StatusCode::INTERNAL_SERVER_ERROR, e),
    };
    let user = StoredUser {
        username: input.username,
        discord_id: input.discord_id,
        role: input.role,
        avatar: input.avatar,
        permissions: input.permissions,
        last_active: botdeck_common::time::unix_now(),
        ..existing
    };
    match users.upsert(user.clone()).await {
        Ok(()) => Json(user).into_response(),
        Err(e) => store_error(StatusCode::BAD_REQUEST, e),
    }
}

async fn delete_user(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.gateway.users.delete(&id).await {
        Ok(true) => Json(json!({ "success": true })).into_response(),
        Ok(false) => not_found("user"),
        Err(e) => store_error(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

// ── Permissions ─────────────────────────────────────────────────────────────

async fn list_permissions() -> impl IntoResponse {
    Json(PERMISSIONS)
}
