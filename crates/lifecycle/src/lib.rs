//! Lifecycle of the single bot connection.
//!
//! [`BotSupervisor`] validates the token, runs the [`RetryPlan`] against a
//! [`botdeck_channels::GatewayConnector`], commits the first connection that
//! comes up and then tracks readiness and dispatches commands in background
//! tasks until the connection is stopped or closes for good.

pub mod credential;
pub mod dispatcher;
pub mod error;
mod readiness;
mod registry;
pub mod retry;
pub mod status;
pub mod supervisor;

pub use {
    credential::validate_credential,
    dispatcher::CommandDispatcher,
    error::{Error, Result},
    retry::{RetryAttempt, RetryPlan},
    status::{ConnectionState, StatusSnapshot},
    supervisor::{
        BotConfig, BotInfo, BotSupervisor, StartFailure, StartReport, StopReport,
        SupervisorOptions,
    },
};
