//! Background observer of a committed connection.
//!
//! Waits for the readiness handshake with its own deadline, then keeps
//! watching for late readiness and for fatal session closes.

use std::{sync::Arc, time::Duration};

use {
    botdeck_channels::{GatewayConnection, GatewayEvent, Subscription},
    tokio::time::Instant,
    tracing::{info, warn},
};

#[cfg(feature = "metrics")]
use botdeck_metrics::{bot as bot_metrics, counter, gauge};

use crate::{registry::Registry, status::ConnectionState};

pub(crate) async fn await_readiness(
    registry: Arc<Registry>,
    generation: u64,
    connection: Arc<dyn GatewayConnection>,
    mut events: Subscription,
    deadline: Duration,
) {
    let deadline = Instant::now() + deadline;

    // The subscription exists already, so a Ready emitted from here on is
    // not lost; one emitted before it shows up in the snapshot.
    let mut waiting = true;
    if connection.snapshot().ready {
        waiting = false;
        promote(&registry, generation);
    }

    loop {
        let event = if waiting {
            match tokio::time::timeout_at(deadline, events.recv()).await {
                Ok(event) => event,
                Err(_) => {
                    waiting = false;
                    // Ready can land in the snapshot without its event, e.g.
                    // when the subscription lagged past it.
                    if connection.snapshot().ready {
                        promote(&registry, generation);
                        continue;
                    }
                    warn!("ready event timeout, but bot may still be functional");
                    #[cfg(feature = "metrics")]
                    counter!(bot_metrics::READINESS_TIMEOUTS_TOTAL).increment(1);
                    registry.transition(generation, ConnectionState::Degraded);
                    continue;
                },
            }
        } else {
            events.recv().await
        };
        let Some(event) = event else {
            return;
        };

        match event {
            GatewayEvent::Ready => {
                waiting = false;
                promote(&registry, generation);
            },
            GatewayEvent::Error(message) => {
                warn!(error = %message, "bot connection reported an error");
                if waiting {
                    waiting = false;
                    registry.transition(generation, ConnectionState::Degraded);
                }
            },
            GatewayEvent::Closed { fatal: true, reason } => {
                terminate(&registry, generation, &reason).await;
                return;
            },
            GatewayEvent::Closed {
                fatal: false,
                reason,
            } => {
                warn!(%reason, "bot session dropped, reconnecting");
            },
            GatewayEvent::GuildAvailable { .. } | GatewayEvent::GuildRemoved { .. } => {
                #[cfg(feature = "metrics")]
                gauge!(bot_metrics::GUILDS).set(connection.snapshot().guild_count as f64);
            },
            GatewayEvent::Message(_) => {},
        }
    }
}

fn promote(registry: &Registry, generation: u64) {
    match registry.transition(generation, ConnectionState::Operational) {
        Some(ConnectionState::Operational) | None => {},
        Some(previous) => {
            info!(from = ?previous, "bot is fully ready and operational");
        },
    }
}

/// Release the connection after a non-resumable close.
async fn terminate(registry: &Registry, generation: u64, reason: &str) {
    let Some(mut active) = registry.release(generation) else {
        return;
    };
    warn!(%reason, "bot connection closed permanently, releasing it");
    // This task is the tracker; only the dispatcher needs aborting.
    drop(active.tracker.take());
    if let Some(dispatcher) = active.dispatcher.take() {
        dispatcher.abort();
    }
    active.connection.disconnect().await;
    #[cfg(feature = "metrics")]
    gauge!(bot_metrics::CONNECTED).set(0.0);
}
