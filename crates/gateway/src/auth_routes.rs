//! `/api/auth/*`: Discord sign-in for dashboard operators.

use {
    axum::{
        Json, Router,
        extract::State,
        http::{HeaderMap, StatusCode, header},
        response::IntoResponse,
        routing::{get, post},
    },
    botdeck_oauth::{Error, resolve_access},
    serde::Deserialize,
    serde_json::json,
    tracing::warn,
};

use crate::server::AppState;

pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/discord", post(discord_exchange_handler))
        .route("/url", get(authorize_url_handler))
}

#[derive(Deserialize)]
struct ExchangeRequest {
    code: Option<String>,
}

fn origin(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::ORIGIN).and_then(|v| v.to_str().ok())
}

fn error_response(err: &Error) -> axum::response::Response {
    let (status, body) = match err {
        Error::NotConfigured { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "Discord credentials not configured" }),
        ),
        Error::TokenExchange { details, .. } => (
            StatusCode::BAD_REQUEST,
            json!({ "error": "Failed to get access token", "details": details }),
        ),
        Error::UserLookup { details, .. } => (
            StatusCode::BAD_REQUEST,
            json!({ "error": "Failed to get user data", "details": details }),
        ),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "Authentication failed", "details": other.to_string() }),
        ),
    };
    (status, Json(body)).into_response()
}

async fn discord_exchange_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ExchangeRequest>,
) -> impl IntoResponse {
    let Some(code) = body.code.filter(|c| !c.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Authorization code is required" })),
        )
            .into_response();
    };

    let gw = &state.gateway;
    let identity = match gw.oauth.exchange(&code, origin(&headers)).await {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "discord sign-in failed");
            return error_response(&e);
        },
    };

    let access = match resolve_access(
        gw.config.oauth.owner_id.as_deref(),
        gw.users.as_ref(),
        &identity.user.id,
    )
    .await
    {
        Ok(access) => access,
        Err(e) => {
            warn!(error = %e, "role lookup failed");
            None
        },
    };

    let mut value = match serde_json::to_value(&identity) {
        Ok(value) => value,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Authentication failed", "details": e.to_string() })),
            )
                .into_response();
        },
    };
    value["access"] = json!(access);
    Json(value).into_response()
}

async fn authorize_url_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match state.gateway.oauth.authorize_url(origin(&headers)) {
        Ok(url) => Json(json!({ "url": url })).into_response(),
        Err(e) => error_response(&e),
    }
}
