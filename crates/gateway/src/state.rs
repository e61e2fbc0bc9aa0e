use std::sync::Arc;

use {
    botdeck_channels::{
        BotConfigStore, CommandStore, GatewayConnector, MemoryBotConfigStore, MemoryCommandStore,
        MemoryUserStore, StoredBotConfig, UserStore,
    },
    botdeck_config::BotdeckConfig,
    botdeck_lifecycle::{BotSupervisor, SupervisorOptions},
    botdeck_oauth::DiscordOAuth,
};

#[cfg(feature = "metrics")]
use botdeck_metrics::MetricsHandle;

use crate::logs::LogBuffer;

/// Everything the HTTP handlers share.
pub struct GatewayState {
    pub version: String,
    pub config: BotdeckConfig,
    pub supervisor: Arc<BotSupervisor>,
    pub commands: Arc<dyn CommandStore>,
    pub users: Arc<dyn UserStore>,
    pub bot_config: Arc<dyn BotConfigStore>,
    pub oauth: DiscordOAuth,
    pub logs: LogBuffer,
    #[cfg(feature = "metrics")]
    pub metrics_handle: Option<MetricsHandle>,
}

impl GatewayState {
    /// Build state with in-memory stores seeded from `config`.
    pub fn new(
        config: BotdeckConfig,
        connector: Arc<dyn GatewayConnector>,
        logs: LogBuffer,
    ) -> Self {
        let commands: Arc<dyn CommandStore> = Arc::new(MemoryCommandStore::with_builtins());
        let bot_config = Arc::new(MemoryBotConfigStore::new(StoredBotConfig {
            name: config.bot.name.clone(),
            prefix: config.bot.prefix.clone(),
            application_id: config.bot.application_id.clone(),
        }));
        let supervisor = Arc::new(BotSupervisor::new(
            connector,
            Arc::clone(&commands),
            SupervisorOptions::from_config(&config.lifecycle),
        ));

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            oauth: DiscordOAuth::new(config.oauth.clone()),
            config,
            supervisor,
            commands,
            users: Arc::new(MemoryUserStore::default()),
            bot_config,
            logs,
            #[cfg(feature = "metrics")]
            metrics_handle: None,
        }
    }

    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn with_metrics(mut self, handle: MetricsHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
