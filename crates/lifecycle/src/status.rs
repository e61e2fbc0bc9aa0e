use {botdeck_channels::ConnectionSnapshot, serde::Serialize};

/// Where the single bot connection is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Absent,
    /// Committed, waiting for the readiness handshake.
    Connecting,
    Operational,
    /// Readiness did not arrive in time (or an error came first). The handle
    /// is kept and a late readiness event promotes it.
    Degraded,
}

impl ConnectionState {
    #[must_use]
    pub fn is_running(self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// Label reported to dashboard clients.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Absent => "offline",
            Self::Connecting => "connecting",
            Self::Operational => "online",
            Self::Degraded => "error",
        }
    }
}

/// Point-in-time connection health, derived on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub running: bool,
    pub state: &'static str,
    pub uptime_ms: u64,
    pub guild_count: usize,
    pub member_count: u64,
    pub latency_ms: u64,
    pub display_name: Option<String>,
    pub id: Option<String>,
    /// Application id the connection was started with.
    pub application_id: Option<String>,
}

impl StatusSnapshot {
    #[must_use]
    pub fn offline() -> Self {
        Self {
            running: false,
            state: ConnectionState::Absent.label(),
            uptime_ms: 0,
            guild_count: 0,
            member_count: 0,
            latency_ms: 0,
            display_name: None,
            id: None,
            application_id: None,
        }
    }

    /// Reported when the supervisor's own state could not be read.
    #[must_use]
    pub fn unreadable() -> Self {
        Self {
            state: "error",
            ..Self::offline()
        }
    }

    #[must_use]
    pub fn from_connection(
        state: ConnectionState,
        snapshot: &ConnectionSnapshot,
        application_id: Option<&str>,
    ) -> Self {
        Self {
            running: state.is_running(),
            state: state.label(),
            uptime_ms: u64::try_from(snapshot.uptime.as_millis()).unwrap_or(u64::MAX),
            guild_count: snapshot.guild_count,
            member_count: snapshot.member_count,
            latency_ms: latency_ms(snapshot),
            display_name: snapshot.user.as_ref().map(|u| u.username.clone()),
            id: snapshot.user.as_ref().map(|u| u.id.clone()),
            application_id: application_id.map(str::to_string),
        }
    }
}

/// Last heartbeat round-trip in whole milliseconds, 0 before the first ACK.
#[must_use]
pub fn latency_ms(snapshot: &ConnectionSnapshot) -> u64 {
    snapshot
        .latency
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
