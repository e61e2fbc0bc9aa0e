//! Session bookkeeping shared by the event handler and the connection.

use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, RwLock, RwLockWriteGuard},
    time::Duration,
};

use {
    botdeck_channels::{BotUser, ConnectionSnapshot, EstablishError, EventHub, GatewayEvent},
    tokio::{sync::oneshot, time::Instant},
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

pub(crate) type Established = oneshot::Sender<Result<(), EstablishError>>;

#[derive(Default)]
pub(crate) struct SessionState {
    pub ready: bool,
    pub latency: Option<Duration>,
    /// Guild id to member count.
    guilds: HashMap<String, u64>,
    /// Guilds announced in READY that have not arrived yet.
    pending_guilds: HashSet<String>,
    user: Option<BotUser>,
    connected_at: Option<Instant>,
}

/// Outcome of a guild arriving.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct GuildArrival {
    /// The guild was announced in READY (initial load, not a new join).
    pub was_pending: bool,
    /// It was the last pending guild.
    pub completes: bool,
}

impl SessionState {
    pub(crate) fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            ready: self.ready,
            latency: self.latency,
            guild_count: self.guilds.len(),
            member_count: self.guilds.values().sum(),
            user: self.user.clone(),
            uptime: self
                .connected_at
                .map(|t| t.elapsed())
                .unwrap_or_default(),
        }
    }

    /// Record READY. Returns `true` when no guild is left to wait for.
    pub(crate) fn on_ready(
        &mut self,
        user: BotUser,
        guild_ids: impl IntoIterator<Item = String>,
    ) -> bool {
        self.user = Some(user);
        self.connected_at.get_or_insert_with(Instant::now);
        self.guilds.clear();
        self.pending_guilds = guild_ids.into_iter().collect();
        self.pending_guilds.is_empty()
    }

    pub(crate) fn on_guild_create(&mut self, guild_id: &str, member_count: u64) -> GuildArrival {
        self.guilds.insert(guild_id.to_string(), member_count);
        let was_pending = self.pending_guilds.remove(guild_id);
        GuildArrival {
            was_pending,
            completes: was_pending && self.pending_guilds.is_empty(),
        }
    }

    pub(crate) fn on_guild_delete(&mut self, guild_id: &str) {
        self.guilds.remove(guild_id);
        self.pending_guilds.remove(guild_id);
    }

    /// Stop waiting for guilds. Returns how many never arrived.
    pub(crate) fn give_up_waiting(&mut self) -> usize {
        let missing = self.pending_guilds.len();
        self.pending_guilds.clear();
        missing
    }

    /// Returns `true` on the first call after READY.
    pub(crate) fn mark_ready(&mut self) -> bool {
        let changed = !self.ready;
        self.ready = true;
        changed
    }
}

/// State one connection shares with its serenity event handler.
pub(crate) struct Session {
    pub hub: EventHub,
    pub cancel: CancellationToken,
    pub guild_wait: Duration,
    pub presence_name: String,
    state: RwLock<SessionState>,
    established: Mutex<Option<Established>>,
}

impl Session {
    pub(crate) fn new(guild_wait: Duration, presence_name: String) -> Self {
        Self {
            hub: EventHub::default(),
            cancel: CancellationToken::new(),
            guild_wait,
            presence_name,
            state: RwLock::new(SessionState::default()),
            established: Mutex::new(None),
        }
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn snapshot(&self) -> ConnectionSnapshot {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot()
    }

    /// Arm the channel that resolves `connect()`.
    pub(crate) fn arm(&self, tx: Established) {
        *self.established.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);
    }

    /// Resolve a pending `connect()`. Returns `false` if it was already resolved.
    pub(crate) fn resolve(&self, result: Result<(), EstablishError>) -> bool {
        let tx = self
            .established
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match tx {
            Some(tx) => {
                let _ = tx.send(result);
                true
            },
            None => false,
        }
    }

    pub(crate) fn mark_ready(&self) {
        if self.write().mark_ready() {
            info!("discord session ready");
            self.hub.emit(GatewayEvent::Ready);
        }
    }

    /// Declare the session ready after the guild-wait window, unless every
    /// guild arrived first or the connection was closed.
    pub(crate) async fn wait_for_guilds(&self) {
        tokio::select! {
            () = self.cancel.cancelled() => return,
            () = tokio::time::sleep(self.guild_wait) => {},
        }
        if self.write().ready {
            return;
        }
        let missing = self.write().give_up_waiting();
        warn!(missing, "guilds did not arrive in time, declaring session ready");
        self.mark_ready();
    }

    /// The serenity client returned from `start()`.
    pub(crate) fn client_stopped(&self, result: Result<(), EstablishError>) {
        self.write().ready = false;
        let err = match result {
            Ok(()) if self.cancel.is_cancelled() => return,
            Ok(()) => EstablishError::Other("discord client stopped".into()),
            Err(err) => err,
        };
        #[cfg(feature = "metrics")]
        botdeck_metrics::counter!(botdeck_metrics::discord::FATAL_CLOSES_TOTAL).increment(1);
        if self.resolve(Err(err.clone())) {
            return;
        }
        if self.cancel.is_cancelled() {
            return;
        }
        warn!(error = %err, "discord session ended");
        self.hub.emit(GatewayEvent::Closed {
            fatal: true,
            reason: err.to_string(),
        });
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn bot() -> BotUser {
        BotUser {
            id: "999".into(),
            username: "panel-bot".into(),
        }
    }

    #[test]
    fn ready_without_guilds_is_immediately_ready() {
        let mut state = SessionState::default();
        assert!(state.on_ready(bot(), Vec::new()));
        assert_eq!(state.snapshot().user, Some(bot()));
    }

    #[test]
    fn last_pending_guild_completes_readiness() {
        let mut state = SessionState::default();
        assert!(!state.on_ready(bot(), vec!["1".to_string(), "2".to_string()]));

        assert_eq!(state.on_guild_create("1", 10), GuildArrival {
            was_pending: true,
            completes: false,
        });
        assert_eq!(state.on_guild_create("2", 5), GuildArrival {
            was_pending: true,
            completes: true,
        });

        let snap = state.snapshot();
        assert_eq!(snap.guild_count, 2);
        assert_eq!(snap.member_count, 15);
    }

    #[test]
    fn new_join_is_not_pending() {
        let mut state = SessionState::default();
        state.on_ready(bot(), Vec::new());
        let arrival = state.on_guild_create("7", 3);
        assert!(!arrival.was_pending);
        assert!(!arrival.completes);
    }

    #[test]
    fn leaving_a_guild_drops_its_members() {
        let mut state = SessionState::default();
        state.on_ready(bot(), Vec::new());
        state.on_guild_create("1", 10);
        state.on_guild_create("2", 4);
        state.on_guild_delete("1");
        let snap = state.snapshot();
        assert_eq!(snap.guild_count, 1);
        assert_eq!(snap.member_count, 4);
    }

    #[test]
    fn mark_ready_reports_only_the_first_transition() {
        let mut state = SessionState::default();
        assert!(state.mark_ready());
        assert!(!state.mark_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn guild_wait_declares_ready_and_emits_once() {
        let session = Session::new(Duration::from_secs(15), "Panel".into());
        let mut events = session.hub.subscribe();
        session.write().on_ready(bot(), vec!["1".to_string()]);

        session.wait_for_guilds().await;

        assert!(session.snapshot().ready);
        assert!(matches!(events.recv().await, Some(GatewayEvent::Ready)));
        assert!(!session.write().mark_ready());
    }

    #[tokio::test]
    async fn failure_before_ready_resolves_connect() {
        let session = Session::new(Duration::from_secs(1), "Panel".into());
        let (tx, rx) = oneshot::channel();
        session.arm(tx);
        session.client_stopped(Err(EstablishError::InvalidCredential));
        assert_eq!(rx.await.unwrap(), Err(EstablishError::InvalidCredential));
    }

    #[tokio::test]
    async fn failure_after_ready_is_a_fatal_close() {
        let session = Session::new(Duration::from_secs(1), "Panel".into());
        let (tx, _rx) = oneshot::channel();
        session.arm(tx);
        assert!(session.resolve(Ok(())));
        let mut events = session.hub.subscribe();

        session.client_stopped(Err(EstablishError::MissingPrivilege));

        match events.recv().await {
            Some(GatewayEvent::Closed { fatal, .. }) => assert!(fatal),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn requested_stop_is_silent() {
        let session = Session::new(Duration::from_secs(1), "Panel".into());
        let (tx, _rx) = oneshot::channel();
        session.arm(tx);
        session.resolve(Ok(()));
        session.write().mark_ready();
        session.cancel.cancel();

        session.client_stopped(Ok(()));

        assert!(!session.snapshot().ready);
        assert!(!session.resolve(Ok(())));
    }
}
