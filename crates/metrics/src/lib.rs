//! Metrics collection and export for botdeck.
//!
//! Call sites record through the `metrics` facade macros re-exported here.
//! With the `prometheus` feature enabled the gateway renders them on
//! `/metrics`; without it every call is a no-op.
//!
//! ```rust,ignore
//! use botdeck_metrics::{bot, counter};
//!
//! counter!(bot::CONNECT_ATTEMPTS_TOTAL, "attempt" => "quick").increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

pub use metrics::{counter, gauge, histogram};
