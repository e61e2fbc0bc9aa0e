use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::State,
        response::{IntoResponse, Json},
        routing::get,
    },
    botdeck_config::BotdeckConfig,
    botdeck_discord::DiscordConnector,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{info, warn},
};

use crate::{
    admin_routes::admin_router, auth_routes::auth_router, bot_routes::bot_router, logs,
    logs::LogBuffer, state::GatewayState,
};

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayState>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the dashboard router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/api/logs", get(logs::list_logs_handler))
        .nest("/api/bot", bot_router())
        .nest("/api/auth", auth_router())
        .nest("/api", admin_router());

    #[cfg(feature = "prometheus")]
    let router = router.route(
        "/metrics",
        get(crate::metrics_routes::prometheus_metrics_handler),
    );

    #[cfg(feature = "metrics")]
    let router = router.layer(axum::middleware::from_fn(
        crate::metrics_middleware::http_metrics_middleware,
    ));

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { gateway: state })
}

/// Run the dashboard server until Ctrl-C, then stop the bot connection.
pub async fn start_gateway(config: BotdeckConfig, logs: LogBuffer) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let connector = Arc::new(DiscordConnector::new(config.discord.clone()));

    #[cfg(feature = "metrics")]
    let metrics_enabled = config.metrics.enabled;
    let state = GatewayState::new(config, connector, logs);

    #[cfg(feature = "metrics")]
    let state = match botdeck_metrics::init_metrics(botdeck_metrics::MetricsRecorderConfig {
        enabled: metrics_enabled,
        global_labels: vec![("service".into(), "botdeck".into())],
    }) {
        Ok(handle) => state.with_metrics(handle),
        Err(e) => {
            warn!(error = %e, "failed to initialise metrics");
            state
        },
    };

    let state = Arc::new(state);
    let supervisor = Arc::clone(&state.supervisor);
    let app = build_gateway_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "dashboard listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down bot connection");
    supervisor.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.gateway.version,
    }))
}
