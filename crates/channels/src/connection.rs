use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    secrecy::Secret,
    serde::Serialize,
    tokio::sync::broadcast,
    tracing::warn,
};

use crate::Result;

// ── Events (pub/sub) ────────────────────────────────────────────────────────

/// Events a live gateway connection publishes to its subscribers.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    /// Handshake complete; the session is fully usable.
    Ready,
    /// A message was posted in a channel the bot can see.
    Message(InboundMessage),
    /// A guild became available (initial load or a new join).
    GuildAvailable {
        guild_id: String,
        name: String,
        member_count: u64,
    },
    /// The bot left or lost a guild.
    GuildRemoved { guild_id: String },
    /// Non-fatal runtime error reported by the client.
    Error(String),
    /// The session ended. `fatal` means it cannot be resumed.
    Closed { fatal: bool, reason: String },
}

/// Author of an inbound message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAuthor {
    pub id: String,
    pub username: String,
    pub global_name: Option<String>,
    pub bot: bool,
}

impl MessageAuthor {
    /// Name shown in greetings: the global display name, else the username.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }
}

/// A message received from the messaging service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub author: MessageAuthor,
    pub content: String,
}

/// A reply to post back to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub channel_id: String,
    /// Message being replied to, rendered as a reply reference.
    pub reply_to: Option<String>,
    pub content: String,
}

impl OutboundReply {
    #[must_use]
    pub fn to_message(message: &InboundMessage, content: impl Into<String>) -> Self {
        Self {
            channel_id: message.channel_id.clone(),
            reply_to: Some(message.id.clone()),
            content: content.into(),
        }
    }
}

/// The account the bot is logged in as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotUser {
    pub id: String,
    pub username: String,
}

/// Point-in-time view of a connection, read without blocking.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSnapshot {
    pub ready: bool,
    /// Last heartbeat round-trip.
    pub latency: Option<Duration>,
    pub guild_count: usize,
    pub member_count: u64,
    pub user: Option<BotUser>,
    /// Time since the session was established.
    pub uptime: Duration,
}

/// Failure to establish a session, classified at the client boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EstablishError {
    #[error("the gateway rejected the bot token")]
    InvalidCredential,
    #[error("the bot is not allowed to use the requested privileged intents")]
    MissingPrivilege,
    #[error("gateway unreachable: {0}")]
    NetworkUnreachable(String),
    #[error("{0}")]
    Other(String),
}

/// Options applied to every candidate a connector creates.
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Presence name, shown as "Watching {name}".
    pub presence_name: String,
}

/// Receiving end of a connection's event stream.
///
/// Dropping it unsubscribes.
pub struct Subscription {
    rx: broadcast::Receiver<GatewayEvent>,
}

impl Subscription {
    #[must_use]
    pub fn new(rx: broadcast::Receiver<GatewayEvent>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` once the connection dropped its sender.
    ///
    /// Lagging subscribers skip the missed events and keep going.
    pub async fn recv(&mut self) -> Option<GatewayEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "gateway subscriber lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Fan-out hub for [`GatewayEvent`]s, shared by connection implementations.
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<GatewayEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventHub {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription::new(self.tx.subscribe())
    }

    /// Publish to current subscribers. Events with no subscriber are dropped.
    pub fn emit(&self, event: GatewayEvent) {
        let _ = self.tx.send(event);
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

// ── Connection traits ───────────────────────────────────────────────────────

/// One outbound session to the messaging service.
#[async_trait]
pub trait GatewayConnection: Send + Sync {
    /// Open the session and authenticate. Resolves once the service has
    /// accepted the credential; full readiness is announced later through
    /// [`GatewayEvent::Ready`].
    async fn connect(&self, token: &Secret<String>) -> std::result::Result<(), EstablishError>;

    /// Subscribe to the connection's events.
    fn subscribe(&self) -> Subscription;

    /// Post a reply.
    async fn send(&self, reply: OutboundReply) -> Result<()>;

    /// Close the session. Safe to call more than once and on a candidate
    /// that never connected.
    async fn disconnect(&self);

    fn snapshot(&self) -> ConnectionSnapshot;
}

/// Factory for fresh connection candidates; one per establishment attempt.
pub trait GatewayConnector: Send + Sync {
    fn create(&self, options: &ConnectOptions) -> Arc<dyn GatewayConnection>;
}
