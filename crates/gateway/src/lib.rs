//! Dashboard HTTP API.
//!
//! Serves bot start/stop/status over JSON, Discord sign-in for operators,
//! record editing for commands and users, and the captured log view. All
//! connection handling lives in `botdeck-lifecycle`; handlers only translate
//! between HTTP and the supervisor.

pub mod admin_routes;
pub mod auth_routes;
pub mod bot_routes;
pub mod logs;
#[cfg(feature = "metrics")]
pub mod metrics_middleware;
#[cfg(feature = "prometheus")]
pub mod metrics_routes;
pub mod server;
pub mod state;

pub use {
    logs::{LogBuffer, LogCaptureLayer},
    server::{build_gateway_app, start_gateway},
    state::GatewayState,
};
