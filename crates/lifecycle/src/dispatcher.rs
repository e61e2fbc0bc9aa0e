//! Prefix command routing for inbound messages.

use std::sync::Arc;

use {
    botdeck_channels::{
        CommandDefinition, ConnectionSnapshot, GatewayConnection, GatewayEvent, InboundMessage,
        OutboundReply, Subscription,
    },
    botdeck_common::time::format_uptime,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use botdeck_metrics::{commands as command_metrics, counter, labels};

use crate::{
    error::{Error, Result},
    status::latency_ms,
    supervisor::BotConfig,
};

/// Reply sent when a handler fails.
pub const APOLOGY: &str = "❌ An error occurred while executing that command.";

/// Reads the resident memory reported by `status`, in MiB.
pub type MemoryReader = fn() -> Result<u64>;

/// Routes prefixed messages to the built-in handlers.
pub struct CommandDispatcher {
    prefix: String,
    bot_name: String,
    /// Enabled definitions only.
    commands: Vec<CommandDefinition>,
    connection: Arc<dyn GatewayConnection>,
    memory: MemoryReader,
}

impl CommandDispatcher {
    pub fn new(
        config: &BotConfig,
        commands: Vec<CommandDefinition>,
        connection: Arc<dyn GatewayConnection>,
    ) -> Self {
        Self {
            prefix: config.prefix.clone(),
            bot_name: config.name.clone(),
            commands: commands.into_iter().filter(|c| c.enabled).collect(),
            connection,
            memory: process_memory_mb,
        }
    }

    /// Replace how `status` measures memory.
    #[must_use]
    pub fn with_memory_reader(mut self, memory: MemoryReader) -> Self {
        self.memory = memory;
        self
    }

    /// Reply text for `message`, or `None` when the message is not for us.
    ///
    /// Handler failures are logged and answered with [`APOLOGY`].
    pub fn on_message(&self, message: &InboundMessage) -> Option<String> {
        if message.author.bot {
            return None;
        }
        let snapshot = self.connection.snapshot();
        if snapshot
            .user
            .as_ref()
            .is_some_and(|me| me.id == message.author.id)
        {
            return None;
        }
        let rest = message.content.strip_prefix(self.prefix.as_str())?;

        #[cfg(feature = "metrics")]
        counter!(command_metrics::MESSAGES_RECEIVED_TOTAL).increment(1);

        let mut tokens = rest.split_whitespace();
        let command = tokens.next().unwrap_or_default().to_lowercase();
        let args: Vec<&str> = tokens.collect();

        info!(
            command = %command,
            args = args.len(),
            author = %message.author.username,
            guild_id = message.guild_id.as_deref().unwrap_or("dm"),
            "command received"
        );

        match self.execute(&command, message, &snapshot) {
            Ok(reply) => Some(reply),
            Err(err) => {
                warn!(error = %err, "command handler failed");
                #[cfg(feature = "metrics")]
                counter!(command_metrics::HANDLER_ERRORS_TOTAL, labels::COMMAND => command.clone())
                    .increment(1);
                Some(APOLOGY.to_string())
            },
        }
    }

    /// Answer `message` through the connection. Send failures are logged.
    pub async fn handle(&self, message: InboundMessage) {
        let Some(reply) = self.on_message(&message) else {
            return;
        };
        let reply = OutboundReply::to_message(&message, reply);
        if let Err(err) = self.connection.send(reply).await {
            #[cfg(feature = "metrics")]
            counter!(command_metrics::REPLY_FAILURES_TOTAL).increment(1);
            warn!(error = %err, channel_id = %message.channel_id, "failed to send command reply");
        }
    }

    /// Serve messages until the subscription closes or the task is aborted.
    pub async fn run(self, mut events: Subscription) {
        debug!(prefix = %self.prefix, commands = self.commands.len(), "command dispatcher installed");
        while let Some(event) = events.recv().await {
            if let GatewayEvent::Message(message) = event {
                self.handle(message).await;
            }
        }
    }

    fn execute(
        &self,
        command: &str,
        message: &InboundMessage,
        snapshot: &ConnectionSnapshot,
    ) -> Result<String> {
        if !self.commands.iter().any(|c| c.name.eq_ignore_ascii_case(command)) {
            return Ok(self.fallback(command));
        }

        #[cfg(feature = "metrics")]
        counter!(command_metrics::DISPATCHED_TOTAL, labels::COMMAND => command.to_string())
            .increment(1);

        match command {
            "ping" => Ok(format!("🏓 Pong! Latency: {}ms", latency_ms(snapshot))),
            "hello" => Ok(format!(
                "👋 Hello {}! I'm online and ready!",
                message.author.display_name()
            )),
            "test" => Ok("✅ Bot is working correctly!".to_string()),
            "info" => Ok(self.info(snapshot)),
            "help" => Ok(self.help()),
            "status" => self.status(snapshot),
            // Defined in the store but without a handler.
            _ => Ok(self.fallback(command)),
        }
    }

    fn fallback(&self, command: &str) -> String {
        format!(
            "❓ Unknown command: `{command}`. Use `{}help` to see available commands.",
            self.prefix
        )
    }

    fn info(&self, snapshot: &ConnectionSnapshot) -> String {
        let name = snapshot
            .user
            .as_ref()
            .map_or(self.bot_name.as_str(), |u| u.username.as_str());
        format!(
            "🤖 **Bot Information**\n\
             **Bot Name:** {name}\n\
             **Servers:** {}\n\
             **Users:** {}\n\
             **Uptime:** {}\n\
             **Ping:** {}ms\n\
             **Prefix:** {}",
            snapshot.guild_count,
            snapshot.member_count,
            format_uptime(snapshot.uptime),
            latency_ms(snapshot),
            self.prefix,
        )
    }

    fn help(&self) -> String {
        let mut out = format!(
            "📚 **Available Commands**\nHere are the commands you can use with prefix `{}`:",
            self.prefix
        );
        for cmd in &self.commands {
            let args = cmd
                .usage
                .trim_start_matches('!')
                .strip_prefix(cmd.name.as_str())
                .unwrap_or_default()
                .trim();
            let usage = if args.is_empty() {
                format!("{}{}", self.prefix, cmd.name)
            } else {
                format!("{}{} {args}", self.prefix, cmd.name)
            };
            out.push_str(&format!("\n`{usage}` - {}", cmd.description));
        }
        out
    }

    fn status(&self, snapshot: &ConnectionSnapshot) -> Result<String> {
        let memory_mb = (self.memory)()?;
        Ok(format!(
            "📊 **Bot Status**\n\
             **Status:** 🟢 Online\n\
             **Uptime:** {}\n\
             **Memory Usage:** {memory_mb}MB\n\
             **Guilds:** {}\n\
             **Ping:** {}ms",
            format_uptime(snapshot.uptime),
            snapshot.guild_count,
            latency_ms(snapshot),
        ))
    }
}

/// Resident memory of this process in MiB.
pub fn process_memory_mb() -> Result<u64> {
    let handler_error = |message: &str| Error::DispatchHandlerError {
        command: "status".into(),
        message: message.into(),
    };
    let pid = sysinfo::get_current_pid().map_err(handler_error)?;
    let mut sys = sysinfo::System::new();
    sys.refresh_processes_specifics(
        sysinfo::ProcessesToUpdate::Some(&[pid]),
        false,
        sysinfo::ProcessRefreshKind::nothing().with_memory(),
    );
    let process = sys
        .process(pid)
        .ok_or_else(|| handler_error("current process not found"))?;
    Ok(process.memory() / 1024 / 1024)
}
