//! Scripted in-memory gateway used by the lifecycle tests.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    botdeck_channels::{
        BotUser, CommandDefinition, ConnectOptions, ConnectionSnapshot, Error, EstablishError,
        EventHub, GatewayConnection, GatewayConnector, GatewayEvent, InboundMessage,
        MemoryCommandStore, MessageAuthor, OutboundReply, Subscription,
    },
    botdeck_lifecycle::{BotConfig, BotSupervisor, RetryAttempt, RetryPlan, SupervisorOptions},
    secrecy::Secret,
    tokio::sync::Notify,
};

pub const BOT_ID: &str = "999";

/// What a candidate's `connect` does.
#[derive(Clone)]
pub enum Outcome {
    Succeed,
    /// Never resolves; only a timeout ends it.
    Hang,
    Fail(EstablishError),
    /// Succeeds once the notify fires.
    WaitFor(Arc<Notify>),
}

pub struct FakeConnection {
    outcome: Outcome,
    hub: EventHub,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    ready: AtomicBool,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub fail_sends: AtomicBool,
    pub sent: Mutex<Vec<OutboundReply>>,
}

impl FakeConnection {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            hub: EventHub::default(),
            in_flight: Arc::default(),
            max_in_flight: Arc::default(),
            ready: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            fail_sends: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn emit(&self, event: GatewayEvent) {
        self.hub.emit(event);
    }

    pub fn set_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
        self.hub.emit(GatewayEvent::Ready);
    }

    /// Ready in the snapshot without a `Ready` event.
    pub fn set_ready_without_event(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutboundReply> {
        self.sent.lock().unwrap().clone()
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter when a `connect` future ends or is
/// dropped by a timeout.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GatewayConnection for FakeConnection {
    async fn connect(&self, _token: &Secret<String>) -> Result<(), EstablishError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(Arc::clone(&self.in_flight));

        match &self.outcome {
            Outcome::Succeed => Ok(()),
            Outcome::Hang => std::future::pending().await,
            Outcome::Fail(err) => Err(err.clone()),
            Outcome::WaitFor(notify) => {
                notify.notified().await;
                Ok(())
            },
        }
    }

    fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    async fn send(&self, reply: OutboundReply) -> botdeck_channels::Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::unavailable("missing access"));
        }
        self.sent.lock().unwrap().push(reply);
        Ok(())
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.ready.store(false, Ordering::SeqCst);
    }

    fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            ready: self.ready.load(Ordering::SeqCst),
            latency: Some(Duration::from_millis(42)),
            guild_count: 2,
            member_count: 10,
            user: Some(BotUser {
                id: BOT_ID.into(),
                username: "panel-bot".into(),
            }),
            uptime: Duration::from_secs(75),
        }
    }
}

/// Hands out candidates following a script; `Succeed` once it runs out.
#[derive(Default)]
pub struct ScriptedConnector {
    script: Mutex<VecDeque<Outcome>>,
    ready_on_create: bool,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    pub created: Mutex<Vec<Arc<FakeConnection>>>,
}

impl ScriptedConnector {
    pub fn new(script: Vec<Outcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        })
    }

    /// Candidates that report ready before anyone subscribes.
    pub fn already_ready() -> Arc<Self> {
        Arc::new(Self {
            ready_on_create: true,
            ..Default::default()
        })
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn connection(&self, index: usize) -> Arc<FakeConnection> {
        Arc::clone(&self.created.lock().unwrap()[index])
    }

    pub fn max_concurrent_connects(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl GatewayConnector for ScriptedConnector {
    fn create(&self, _options: &ConnectOptions) -> Arc<dyn GatewayConnection> {
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Succeed);
        let mut conn = FakeConnection::new(outcome);
        conn.in_flight = Arc::clone(&self.in_flight);
        conn.max_in_flight = Arc::clone(&self.max_in_flight);
        conn.ready = AtomicBool::new(self.ready_on_create);
        let conn = Arc::new(conn);
        self.created.lock().unwrap().push(Arc::clone(&conn));
        conn
    }
}

pub fn plan() -> RetryPlan {
    RetryPlan::new(vec![
        RetryAttempt {
            timeout: Duration::from_secs(5),
            label: "quick".into(),
        },
        RetryAttempt {
            timeout: Duration::from_secs(10),
            label: "standard".into(),
        },
        RetryAttempt {
            timeout: Duration::from_secs(15),
            label: "extended".into(),
        },
    ])
}

pub fn supervisor(connector: Arc<ScriptedConnector>) -> BotSupervisor {
    BotSupervisor::new(
        connector,
        Arc::new(MemoryCommandStore::with_builtins()),
        SupervisorOptions {
            retry_plan: plan(),
            readiness_timeout: Duration::from_secs(20),
        },
    )
}

pub fn config(token: &str) -> BotConfig {
    BotConfig {
        token: Secret::new(token.into()),
        name: "Bot Management Panel".into(),
        prefix: "!".into(),
        application_id: None,
    }
}

pub fn message(author_id: &str, content: &str) -> InboundMessage {
    InboundMessage {
        id: "m1".into(),
        channel_id: "c1".into(),
        guild_id: Some("g1".into()),
        author: MessageAuthor {
            id: author_id.into(),
            username: "alice".into(),
            global_name: Some("Alice".into()),
            bot: false,
        },
        content: content.into(),
    }
}

pub fn builtins() -> Vec<CommandDefinition> {
    CommandDefinition::builtins()
}

/// Poll `check` while letting background tasks (and paused time) advance.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
