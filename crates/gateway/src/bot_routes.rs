//! `/api/bot/*`: start, stop, status and the stored bot settings.

use {
    axum::{
        Json, Router,
        extract::State,
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
    },
    botdeck_channels::StoredBotConfig,
    botdeck_lifecycle::{BotConfig, Error, StartFailure},
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::json,
    tracing::{info, warn},
};

use crate::server::AppState;

pub fn bot_router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start_handler))
        .route("/stop", post(stop_handler))
        .route("/status", get(status_handler))
        .route("/config", get(get_config_handler).put(put_config_handler))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartOverrides {
    name: Option<String>,
    prefix: Option<String>,
    application_id: Option<String>,
}

#[derive(Deserialize)]
struct StartRequest {
    token: Option<String>,
    #[serde(default)]
    config: StartOverrides,
}

/// HTTP status for a failed start: our input problem, an upstream refusal,
/// or an upstream that never answered.
fn failure_status(error: &Error) -> StatusCode {
    match error {
        Error::InvalidCredentialFormat => StatusCode::BAD_REQUEST,
        Error::AttemptTimeout { .. } | Error::AttemptsExhausted { .. } => {
            StatusCode::GATEWAY_TIMEOUT
        },
        Error::InvalidCredential
        | Error::MissingPrivilege
        | Error::NetworkUnreachable { .. }
        | Error::DispatchHandlerError { .. } => StatusCode::BAD_GATEWAY,
    }
}

fn failure_response(failure: StartFailure) -> axum::response::Response {
    let status = failure_status(&failure.error);
    (
        status,
        Json(json!({
            "error": failure.error.headline(),
            "details": failure.error.to_string(),
            "code": failure.error.code(),
            "logs": failure.logs,
        })),
    )
        .into_response()
}

async fn start_handler(
    State(state): State<AppState>,
    Json(body): Json<StartRequest>,
) -> impl IntoResponse {
    let gw = &state.gateway;
    let stored = match gw.bot_config.get().await {
        Ok(stored) => stored,
        Err(e) => {
            warn!(error = %e, "failed to read stored bot config");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to read bot config", "details": e.to_string() })),
            )
                .into_response();
        },
    };

    // A token in the request wins over the configured one. A missing token
    // is left empty and rejected by credential validation with a log trail.
    let token = body
        .token
        .filter(|t| !t.trim().is_empty())
        .map(Secret::new)
        .or_else(|| gw.config.bot.token.clone())
        .unwrap_or_else(|| Secret::new(String::new()));

    let config = BotConfig {
        token,
        name: body.config.name.unwrap_or(stored.name),
        prefix: body.config.prefix.unwrap_or(stored.prefix),
        application_id: body.config.application_id.or(stored.application_id),
    };
    info!(name = %config.name, prefix = %config.prefix, "bot start requested");

    match gw.supervisor.start(config).await {
        Ok(report) => Json(json!({
            "success": true,
            "message": report.message,
            "info": report.info,
            "logs": report.logs,
        }))
        .into_response(),
        Err(failure) => failure_response(failure),
    }
}

async fn stop_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.gateway.supervisor.stop().await)
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.gateway.supervisor.status())
}

async fn get_config_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.gateway.bot_config.get().await {
        Ok(cfg) => Json(json!({
            "name": cfg.name,
            "prefix": cfg.prefix,
            "applicationId": cfg.application_id,
            "tokenConfigured": state
                .gateway
                .config
                .bot
                .token
                .as_ref()
                .is_some_and(|t| !t.expose_secret().is_empty()),
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn put_config_handler(
    State(state): State<AppState>,
    Json(body): Json<StoredBotConfig>,
) -> impl IntoResponse {
    match state.gateway.bot_config.put(body.clone()).await {
        Ok(()) => Json(body).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_statuses() {
        assert_eq!(
            failure_status(&Error::InvalidCredentialFormat),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            failure_status(&Error::InvalidCredential),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            failure_status(&Error::MissingPrivilege),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            failure_status(&Error::NetworkUnreachable {
                message: "dns".into()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            failure_status(&Error::AttemptsExhausted {
                attempts: 3,
                last_cause: "timeout".into()
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
