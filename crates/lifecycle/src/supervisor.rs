use std::{sync::Arc, time::Duration};

use {
    botdeck_channels::{
        CommandDefinition, CommandStore, ConnectOptions, ConnectionSnapshot, GatewayConnection,
        GatewayConnector,
    },
    botdeck_config::LifecycleConfig,
    secrecy::{ExposeSecret, Secret},
    serde::Serialize,
    tokio::sync::Mutex,
    tracing::{info, warn},
};

#[cfg(feature = "metrics")]
use {
    botdeck_metrics::{bot as bot_metrics, counter, gauge, histogram, labels},
    std::time::Instant,
};

use crate::{
    credential::validate_credential,
    dispatcher::CommandDispatcher,
    error::Error,
    readiness::await_readiness,
    registry::{Active, Registry},
    retry::{self, RetryPlan},
    status::{ConnectionState, StatusSnapshot, latency_ms},
};

/// Settings for one connection's life. Changing them needs a stop/start.
#[derive(Clone)]
pub struct BotConfig {
    pub token: Secret<String>,
    /// Presence name, shown as "Watching {name}".
    pub name: String,
    pub prefix: String,
    pub application_id: Option<String>,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"[REDACTED]")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("application_id", &self.application_id)
            .finish()
    }
}

/// Identity and counts of the freshly established connection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotInfo {
    pub display_name: String,
    pub id: String,
    pub guild_count: usize,
    pub user_count: u64,
    pub latency_ms: u64,
}

impl BotInfo {
    fn from_snapshot(snapshot: &ConnectionSnapshot) -> Self {
        Self {
            display_name: snapshot
                .user
                .as_ref()
                .map_or_else(|| "Connecting...".to_string(), |u| u.username.clone()),
            id: snapshot
                .user
                .as_ref()
                .map_or_else(|| "pending".to_string(), |u| u.id.clone()),
            guild_count: snapshot.guild_count,
            user_count: snapshot.member_count,
            latency_ms: latency_ms(snapshot),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartReport {
    pub message: String,
    pub info: BotInfo,
    pub logs: Vec<String>,
}

/// A failed start with the log trail collected up to the failure.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct StartFailure {
    pub error: Error,
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopReport {
    pub success: bool,
    pub message: String,
}

/// Tuning for a [`BotSupervisor`].
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    pub retry_plan: RetryPlan,
    pub readiness_timeout: Duration,
}

impl SupervisorOptions {
    #[must_use]
    pub fn from_config(config: &LifecycleConfig) -> Self {
        Self {
            retry_plan: RetryPlan::from_config(config),
            readiness_timeout: config.readiness_timeout(),
        }
    }
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self::from_config(&LifecycleConfig::default())
    }
}

/// Owns the process's single bot connection.
///
/// Starts are serialised by a start gate; the committed connection lives in
/// a [`Registry`] slot that `status` and `stop` read without waiting on it.
pub struct BotSupervisor {
    connector: Arc<dyn GatewayConnector>,
    commands: Arc<dyn CommandStore>,
    options: SupervisorOptions,
    start_gate: Mutex<()>,
    registry: Arc<Registry>,
}

impl BotSupervisor {
    pub fn new(
        connector: Arc<dyn GatewayConnector>,
        commands: Arc<dyn CommandStore>,
        options: SupervisorOptions,
    ) -> Self {
        Self {
            connector,
            commands,
            options,
            start_gate: Mutex::new(()),
            registry: Arc::new(Registry::default()),
        }
    }

    /// Replace any running connection with a new one for `config`.
    ///
    /// Returns once a connection is established; readiness is tracked in the
    /// background.
    pub async fn start(&self, config: BotConfig) -> Result<StartReport, StartFailure> {
        let _gate = self.start_gate.lock().await;
        #[cfg(feature = "metrics")]
        let started = Instant::now();

        let result = self.start_locked(config).await;

        #[cfg(feature = "metrics")]
        {
            counter!(
                bot_metrics::START_REQUESTS_TOTAL,
                labels::OUTCOME => match &result {
                    Ok(_) => "success",
                    Err(failure) => failure.error.code(),
                },
            )
            .increment(1);
            if result.is_ok() {
                histogram!(bot_metrics::CONNECT_DURATION_SECONDS)
                    .record(started.elapsed().as_secs_f64());
            }
        }

        result
    }

    async fn start_locked(&self, config: BotConfig) -> Result<StartReport, StartFailure> {
        let mut logs = Vec::new();
        info!(name = %config.name, prefix = %config.prefix, "starting bot");

        let (generation, previous) = self.registry.take();
        if let Some(previous) = previous {
            info!("stopping existing bot instance");
            logs.push("Stopping existing bot instance...".to_string());
            teardown(previous).await;
        }

        if let Err(error) = validate_credential(config.token.expose_secret()) {
            warn!("rejected malformed bot token");
            return Err(fail(error, logs));
        }
        logs.push("Bot token format validated".to_string());

        let options = ConnectOptions {
            presence_name: config.name.clone(),
        };
        let connection = match retry::establish(
            self.connector.as_ref(),
            &options,
            &config.token,
            &self.options.retry_plan,
            &mut logs,
        )
        .await
        {
            Ok(connection) => connection,
            Err(error) => {
                warn!(error = %error, "bot connection could not be established");
                return Err(fail(error, logs));
            },
        };
        logs.push("Bot token validated successfully".to_string());
        logs.push("Discord WebSocket connection established".to_string());
        logs.push("Bot login completed".to_string());

        let commands = match self.commands.list().await {
            Ok(commands) => commands,
            Err(err) => {
                warn!(error = %err, "could not load command definitions, using built-ins");
                CommandDefinition::builtins()
            },
        };
        let info = BotInfo::from_snapshot(&connection.snapshot());

        if !self.commit(generation, Arc::clone(&connection), &config, commands) {
            warn!("bot was stopped while connecting, discarding the new connection");
            connection.disconnect().await;
            return Err(fail(
                Error::AttemptsExhausted {
                    attempts: self.options.retry_plan.len(),
                    last_cause: "start was cancelled by a stop request".into(),
                },
                logs,
            ));
        }

        logs.push("Initializing bot features...".to_string());
        info!(user = %info.display_name, guilds = info.guild_count, "bot connection established");
        Ok(StartReport {
            message: "Bot connection established successfully".into(),
            info,
            logs,
        })
    }

    /// Install `connection` and its background tasks, unless a stop bumped
    /// the generation in the meantime.
    fn commit(
        &self,
        generation: u64,
        connection: Arc<dyn GatewayConnection>,
        config: &BotConfig,
        commands: Vec<CommandDefinition>,
    ) -> bool {
        let mut slot = self.registry.write();
        if slot.generation != generation || slot.active.is_some() {
            return false;
        }

        let tracker = tokio::spawn(await_readiness(
            Arc::clone(&self.registry),
            generation,
            Arc::clone(&connection),
            connection.subscribe(),
            self.options.readiness_timeout,
        ));
        let dispatcher = CommandDispatcher::new(config, commands, Arc::clone(&connection));
        let dispatcher = tokio::spawn(dispatcher.run(connection.subscribe()));

        slot.active = Some(Active {
            generation,
            connection,
            state: ConnectionState::Connecting,
            application_id: config.application_id.clone(),
            tracker: Some(tracker),
            dispatcher: Some(dispatcher),
        });

        #[cfg(feature = "metrics")]
        gauge!(bot_metrics::CONNECTED).set(1.0);
        true
    }

    /// Point-in-time health. Never fails.
    pub fn status(&self) -> StatusSnapshot {
        let (state, connection, application_id) = {
            let Some(slot) = self.registry.try_read() else {
                return StatusSnapshot::unreadable();
            };
            match &slot.active {
                Some(active) => (
                    active.state,
                    Arc::clone(&active.connection),
                    active.application_id.clone(),
                ),
                None => return StatusSnapshot::offline(),
            }
        };
        StatusSnapshot::from_connection(state, &connection.snapshot(), application_id.as_deref())
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.registry
            .try_read()
            .and_then(|slot| slot.active.as_ref().map(|a| a.state))
            .unwrap_or_default()
    }

    /// Tear down the running connection, if any. Idempotent.
    pub async fn stop(&self) -> StopReport {
        let (_, active) = self.registry.take();
        let Some(active) = active else {
            return StopReport {
                success: false,
                message: "Bot is not running".into(),
            };
        };

        info!("stopping bot");
        teardown(active).await;
        #[cfg(feature = "metrics")]
        counter!(bot_metrics::STOPS_TOTAL).increment(1);
        StopReport {
            success: true,
            message: "Bot stopped successfully".into(),
        }
    }

    /// Process-exit hook.
    pub async fn shutdown(&self) {
        if self.stop().await.success {
            info!("bot connection closed for shutdown");
        }
    }
}

fn fail(error: Error, mut logs: Vec<String>) -> StartFailure {
    logs.push(format!("Error: {}", error.headline()));
    logs.extend(error.hints().iter().map(|h| (*h).to_string()));
    StartFailure { error, logs }
}

async fn teardown(mut active: Active) {
    active.abort_tasks();
    active.connection.disconnect().await;
    #[cfg(feature = "metrics")]
    gauge!(bot_metrics::CONNECTED).set(0.0);
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, botdeck_channels::MemoryCommandStore};

    struct UnusedConnector;

    impl GatewayConnector for UnusedConnector {
        fn create(&self, _options: &ConnectOptions) -> Arc<dyn GatewayConnection> {
            panic!("no connection expected");
        }
    }

    fn supervisor() -> BotSupervisor {
        BotSupervisor::new(
            Arc::new(UnusedConnector),
            Arc::new(MemoryCommandStore::with_builtins()),
            SupervisorOptions::default(),
        )
    }

    #[test]
    fn poisoned_registry_reports_error_state() {
        let sup = supervisor();
        sup.registry.poison();
        let status = sup.status();
        assert!(!status.running);
        assert_eq!(status.state, "error");
    }

    #[test]
    fn failure_log_ends_with_headline_and_hints() {
        let failure = fail(Error::InvalidCredentialFormat, vec!["first".into()]);
        assert_eq!(failure.logs, vec![
            "first",
            "Error: Invalid token format",
            "Please check your bot token",
        ]);
    }

    #[test]
    fn config_debug_hides_token() {
        let config = BotConfig {
            token: Secret::new("abc.def".into()),
            name: "Panel".into(),
            prefix: "!".into(),
            application_id: None,
        };
        assert!(!format!("{config:?}").contains("abc.def"));
    }
}
