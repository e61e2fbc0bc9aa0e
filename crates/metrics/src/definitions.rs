//! Metric name and label definitions.
//!
//! Every metric the workspace records is named here so the exported set is
//! documented in one place.

/// HTTP request metrics
pub mod http {
    /// Total number of HTTP requests handled
    pub const REQUESTS_TOTAL: &str = "botdeck_http_requests_total";
    /// Duration of HTTP requests in seconds
    pub const REQUEST_DURATION_SECONDS: &str = "botdeck_http_request_duration_seconds";
    /// Number of currently in-flight HTTP requests
    pub const REQUESTS_IN_FLIGHT: &str = "botdeck_http_requests_in_flight";
}

/// Bot connection lifecycle metrics
pub mod bot {
    /// Start requests received (labels: outcome)
    pub const START_REQUESTS_TOTAL: &str = "botdeck_bot_start_requests_total";
    /// Individual connection attempts (labels: attempt, outcome)
    pub const CONNECT_ATTEMPTS_TOTAL: &str = "botdeck_bot_connect_attempts_total";
    /// Time from start request to established connection
    pub const CONNECT_DURATION_SECONDS: &str = "botdeck_bot_connect_duration_seconds";
    /// 1 while a connection is registered, 0 otherwise
    pub const CONNECTED: &str = "botdeck_bot_connected";
    /// Readiness tracker gave up waiting
    pub const READINESS_TIMEOUTS_TOTAL: &str = "botdeck_bot_readiness_timeouts_total";
    /// Stop requests that tore down a connection
    pub const STOPS_TOTAL: &str = "botdeck_bot_stops_total";
    /// Last gateway heartbeat round-trip in milliseconds
    pub const LATENCY_MS: &str = "botdeck_bot_latency_ms";
    /// Guilds the bot is currently in
    pub const GUILDS: &str = "botdeck_bot_guilds";
}

/// Command dispatch metrics
pub mod commands {
    /// Messages seen by the dispatcher
    pub const MESSAGES_RECEIVED_TOTAL: &str = "botdeck_messages_received_total";
    /// Commands dispatched (labels: command)
    pub const DISPATCHED_TOTAL: &str = "botdeck_commands_dispatched_total";
    /// Handler failures (labels: command)
    pub const HANDLER_ERRORS_TOTAL: &str = "botdeck_command_handler_errors_total";
    /// Replies that could not be delivered
    pub const REPLY_FAILURES_TOTAL: &str = "botdeck_command_reply_failures_total";
}

/// Discord gateway client metrics
pub mod discord {
    /// Gateway sessions opened
    pub const SESSIONS_TOTAL: &str = "botdeck_discord_sessions_total";
    /// Gateway dispatch events received (labels: event)
    pub const DISPATCH_EVENTS_TOTAL: &str = "botdeck_discord_dispatch_events_total";
    /// Client stopped by an error rather than a requested shutdown
    pub const FATAL_CLOSES_TOTAL: &str = "botdeck_discord_fatal_closes_total";
    /// REST message sends (labels: outcome)
    pub const MESSAGES_SENT_TOTAL: &str = "botdeck_discord_messages_sent_total";
}

/// OAuth metrics
pub mod oauth {
    /// Code exchange operations
    pub const CODE_EXCHANGE_TOTAL: &str = "botdeck_oauth_code_exchange_total";
    /// Code exchange errors
    pub const CODE_EXCHANGE_ERRORS_TOTAL: &str = "botdeck_oauth_code_exchange_errors_total";
}

/// Common label keys used across metrics
pub mod labels {
    pub const ENDPOINT: &str = "endpoint";
    pub const METHOD: &str = "method";
    pub const STATUS: &str = "status";
    pub const ATTEMPT: &str = "attempt";
    pub const OUTCOME: &str = "outcome";
    pub const COMMAND: &str = "command";
    pub const EVENT: &str = "event";
}

/// Standard histogram buckets
pub mod buckets {
    /// HTTP request duration buckets (in seconds), 1ms to 60s
    pub const HTTP_DURATION: &[f64] = &[
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
    ];

    /// Bot connect duration buckets (in seconds). A full retry plan can take
    /// close to a minute.
    pub const CONNECT_DURATION: &[f64] = &[
        0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 7.5, 10.0, 15.0, 20.0, 30.0, 45.0, 60.0,
    ];
}
