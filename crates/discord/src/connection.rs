use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use {
    async_trait::async_trait,
    botdeck_channels::{
        ConnectOptions, ConnectionSnapshot, Error, EstablishError, GatewayConnection,
        GatewayConnector, OutboundReply, Result, Subscription, error::Context,
    },
    botdeck_config::{DiscordConfig, GatewayIntent},
    secrecy::{ExposeSecret, Secret},
    serenity::{
        Client, Error as SerenityError,
        all::{ChannelId, CreateMessage, GatewayIntents, MessageId},
        gateway::{GatewayError, ShardManager},
        http::{Http, HttpError},
    },
    tokio::{sync::oneshot, task::JoinHandle},
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use botdeck_metrics::{counter, discord as discord_metrics, labels};

use crate::{handler::DiscordHandler, state::Session};

/// How long `disconnect` waits for the client task to wind down.
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);
/// How often the shard runner's heartbeat latency is copied into the snapshot.
const LATENCY_POLL: Duration = Duration::from_secs(5);
/// Discord rejects message content longer than this.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Serenity intents for the configured set.
#[must_use]
pub fn intents(configured: &[GatewayIntent]) -> GatewayIntents {
    configured
        .iter()
        .fold(GatewayIntents::empty(), |acc, intent| {
            acc | match intent {
                GatewayIntent::Guilds => GatewayIntents::GUILDS,
                GatewayIntent::GuildMembers => GatewayIntents::GUILD_MEMBERS,
                GatewayIntent::GuildMessages => GatewayIntents::GUILD_MESSAGES,
                GatewayIntent::DirectMessages => GatewayIntents::DIRECT_MESSAGES,
                GatewayIntent::MessageContent => GatewayIntents::MESSAGE_CONTENT,
            }
        })
}

/// Translate a serenity failure into the establishment taxonomy.
#[must_use]
pub fn classify(err: &SerenityError) -> EstablishError {
    match err {
        SerenityError::Gateway(GatewayError::InvalidAuthentication) => {
            EstablishError::InvalidCredential
        },
        SerenityError::Gateway(GatewayError::DisallowedGatewayIntents) => {
            EstablishError::MissingPrivilege
        },
        SerenityError::Http(http) => classify_http(http),
        SerenityError::Io(e) => EstablishError::NetworkUnreachable(e.to_string()),
        SerenityError::Tungstenite(e) => EstablishError::NetworkUnreachable(e.to_string()),
        other => EstablishError::Other(other.to_string()),
    }
}

fn classify_http(err: &HttpError) -> EstablishError {
    if err.status_code().is_some_and(|s| s.as_u16() == 401) {
        return EstablishError::InvalidCredential;
    }
    match err {
        HttpError::Request(e) => EstablishError::NetworkUnreachable(e.to_string()),
        other => EstablishError::Other(other.to_string()),
    }
}

/// Creates one [`DiscordConnection`] per connection attempt.
pub struct DiscordConnector {
    config: DiscordConfig,
}

impl DiscordConnector {
    #[must_use]
    pub fn new(config: DiscordConfig) -> Self {
        Self { config }
    }
}

impl GatewayConnector for DiscordConnector {
    fn create(&self, options: &ConnectOptions) -> Arc<dyn GatewayConnection> {
        Arc::new(DiscordConnection::new(&self.config, options))
    }
}

/// Handles serenity hands out once the client is built.
#[derive(Default)]
struct Running {
    shard_manager: Option<Arc<ShardManager>>,
    http: Option<Arc<Http>>,
    tasks: Vec<JoinHandle<()>>,
}

/// A single serenity client, started on `connect` and shut down on
/// `disconnect`.
///
/// Connections are single-use: once disconnected they cannot connect again.
pub struct DiscordConnection {
    intents: GatewayIntents,
    session: Arc<Session>,
    running: Mutex<Running>,
}

impl DiscordConnection {
    #[must_use]
    pub fn new(config: &DiscordConfig, options: &ConnectOptions) -> Self {
        Self {
            intents: intents(&config.intents),
            session: Arc::new(Session::new(
                config.guild_wait(),
                options.presence_name.clone(),
            )),
            running: Mutex::new(Running::default()),
        }
    }

    fn running(&self) -> MutexGuard<'_, Running> {
        self.running.lock().unwrap_or_else(|e| e.into_inner())
    }
}

async fn poll_latency(session: Arc<Session>, shard_manager: Arc<ShardManager>) {
    let mut tick = tokio::time::interval(LATENCY_POLL);
    loop {
        tokio::select! {
            () = session.cancel.cancelled() => return,
            _ = tick.tick() => {},
        }
        let latency = {
            let runners = shard_manager.runners.lock().await;
            runners.values().find_map(|runner| runner.latency)
        };
        if latency.is_some() {
            session.write().latency = latency;
        }
    }
}

#[async_trait]
impl GatewayConnection for DiscordConnection {
    async fn connect(&self, token: &Secret<String>) -> std::result::Result<(), EstablishError> {
        if self.session.cancel.is_cancelled() {
            return Err(EstablishError::Other("connection was closed".into()));
        }
        if !self.running().tasks.is_empty() {
            return Err(EstablishError::Other("connection already started".into()));
        }

        let (tx, rx) = oneshot::channel();
        self.session.arm(tx);

        let mut client = Client::builder(token.expose_secret(), self.intents)
            .event_handler(DiscordHandler::new(Arc::clone(&self.session)))
            .await
            .map_err(|e| classify(&e))?;

        let shard_manager = Arc::clone(&client.shard_manager);
        let http = Arc::clone(&client.http);
        let session = Arc::clone(&self.session);
        let client_task = tokio::spawn(async move {
            let result = client.start().await.map_err(|e| classify(&e));
            session.client_stopped(result);
        });
        let latency_task = tokio::spawn(poll_latency(
            Arc::clone(&self.session),
            Arc::clone(&shard_manager),
        ));
        {
            let mut running = self.running();
            running.http = Some(http);
            running.shard_manager = Some(shard_manager);
            running.tasks.extend([client_task, latency_task]);
        }

        rx.await.unwrap_or_else(|_| {
            Err(EstablishError::Other(
                "discord client stopped before READY".into(),
            ))
        })
    }

    fn subscribe(&self) -> Subscription {
        self.session.hub.subscribe()
    }

    async fn send(&self, reply: OutboundReply) -> Result<()> {
        if self.session.cancel.is_cancelled() {
            return Err(Error::unavailable("discord connection is closed"));
        }
        let http = self
            .running()
            .http
            .clone()
            .context("discord connection is not established")?;
        let channel_id = parse_id(&reply.channel_id)
            .map(ChannelId::new)
            .ok_or_else(|| Error::invalid_input("reply has no valid channel id"))?;

        let mut message = CreateMessage::new().content(truncate(&reply.content, MAX_MESSAGE_LEN));
        if let Some(message_id) = reply.reply_to.as_deref().and_then(parse_id) {
            message = message.reference_message((channel_id, MessageId::new(message_id)));
        }

        let result = channel_id.send_message(http.as_ref(), message).await;

        #[cfg(feature = "metrics")]
        counter!(
            discord_metrics::MESSAGES_SENT_TOTAL,
            labels::OUTCOME => if result.is_ok() { "success" } else { "failure" },
        )
        .increment(1);

        result.context("send discord message")?;
        debug!(channel_id = %reply.channel_id, "discord message sent");
        Ok(())
    }

    async fn disconnect(&self) {
        self.session.cancel.cancel();
        let (shard_manager, tasks) = {
            let mut running = self.running();
            running.http = None;
            (
                running.shard_manager.take(),
                std::mem::take(&mut running.tasks),
            )
        };
        if let Some(shard_manager) = shard_manager {
            shard_manager.shutdown_all().await;
        }
        for mut task in tasks {
            if tokio::time::timeout(DISCONNECT_GRACE, &mut task)
                .await
                .is_err()
            {
                warn!("discord client did not stop in time");
                task.abort();
            }
        }
        self.session.write().ready = false;
    }

    fn snapshot(&self) -> ConnectionSnapshot {
        self.session.snapshot()
    }
}

/// Discord snowflakes are non-zero integers.
fn parse_id(raw: &str) -> Option<u64> {
    raw.parse::<u64>().ok().filter(|id| *id != 0)
}

/// Cut `text` to at most `max` characters on a char boundary.
fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
