#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::{sync::Arc, time::Duration};

use {
    botdeck_channels::{EstablishError, GatewayEvent},
    botdeck_lifecycle::{ConnectionState, Error},
    common::{Outcome, ScriptedConnector, config, eventually, message, supervisor},
    rstest::rstest,
    tokio::{sync::Notify, time::Instant},
};

#[tokio::test]
async fn malformed_token_makes_no_network_calls() {
    let connector = ScriptedConnector::new(vec![]);
    let sup = supervisor(Arc::clone(&connector));

    let failure = sup.start(config("not a token!")).await.unwrap_err();

    assert_eq!(failure.error, Error::InvalidCredentialFormat);
    assert_eq!(connector.created_count(), 0);
    assert!(failure.logs.contains(&"Error: Invalid token format".to_string()));
    assert_eq!(sup.state(), ConnectionState::Absent);
}

#[tokio::test(start_paused = true)]
async fn timeouts_exhaust_plan_sequentially() {
    let connector = ScriptedConnector::new(vec![Outcome::Hang, Outcome::Hang, Outcome::Hang]);
    let sup = supervisor(Arc::clone(&connector));
    let began = Instant::now();

    let failure = sup.start(config("abc.def")).await.unwrap_err();

    assert!(matches!(failure.error, Error::AttemptsExhausted { attempts: 3, .. }));
    assert_eq!(connector.created_count(), 3);
    assert_eq!(connector.max_concurrent_connects(), 1);
    assert_eq!(began.elapsed(), Duration::from_secs(30));
    for i in 0..3 {
        assert_eq!(connector.connection(i).disconnect_count(), 1);
    }
    assert!(!sup.status().running);
    assert_eq!(sup.status().state, "offline");
}

#[tokio::test(start_paused = true)]
async fn success_stops_the_plan() {
    let connector = ScriptedConnector::new(vec![
        Outcome::Hang,
        Outcome::Succeed,
        Outcome::Succeed,
    ]);
    let sup = supervisor(Arc::clone(&connector));

    let report = sup.start(config("abc.def")).await.unwrap();

    assert_eq!(report.message, "Bot connection established successfully");
    assert_eq!(report.info.display_name, "panel-bot");
    assert_eq!(report.info.guild_count, 2);
    assert_eq!(connector.created_count(), 2);
    assert_eq!(connector.connection(0).disconnect_count(), 1);
    assert_eq!(connector.connection(1).disconnect_count(), 0);
    assert!(report.logs.iter().any(|l| l.contains("Attempt 2/3 (standard) succeeded")));
    assert_eq!(sup.state(), ConnectionState::Connecting);
}

#[rstest]
#[case(EstablishError::InvalidCredential, "InvalidCredential")]
#[case(EstablishError::MissingPrivilege, "MissingPrivilege")]
#[case(EstablishError::NetworkUnreachable("connection refused".into()), "NetworkUnreachable")]
#[case(EstablishError::Other("handshake failed".into()), "AttemptsExhausted")]
#[tokio::test(start_paused = true)]
async fn last_attempt_decides_the_error(#[case] last: EstablishError, #[case] code: &str) {
    let connector = ScriptedConnector::new(vec![
        Outcome::Hang,
        Outcome::Fail(EstablishError::Other("flaky".into())),
        Outcome::Fail(last),
    ]);
    let sup = supervisor(Arc::clone(&connector));

    let failure = sup.start(config("abc.def")).await.unwrap_err();

    assert_eq!(failure.error.code(), code);
    if let Error::AttemptsExhausted { attempts, .. } = failure.error {
        assert_eq!(attempts, 3);
    }
    assert_eq!(connector.created_count(), 3);
    assert_eq!(sup.state(), ConnectionState::Absent);
}

#[tokio::test]
async fn stop_without_connection_is_a_no_op() {
    let connector = ScriptedConnector::new(vec![]);
    let sup = supervisor(Arc::clone(&connector));

    for _ in 0..2 {
        let report = sup.stop().await;
        assert!(!report.success);
        assert_eq!(report.message, "Bot is not running");
    }
    assert_eq!(connector.created_count(), 0);
}

#[tokio::test]
async fn stop_releases_the_connection_once() {
    let connector = ScriptedConnector::new(vec![]);
    let sup = supervisor(Arc::clone(&connector));
    sup.start(config("abc.def")).await.unwrap();

    let report = sup.stop().await;
    assert!(report.success);
    assert_eq!(report.message, "Bot stopped successfully");
    assert_eq!(connector.connection(0).disconnect_count(), 1);
    assert_eq!(sup.status().state, "offline");

    assert!(!sup.stop().await.success);
    assert_eq!(connector.connection(0).disconnect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn status_follows_readiness() {
    let connector = ScriptedConnector::new(vec![]);
    let sup = supervisor(Arc::clone(&connector));

    let before = sup.status();
    assert!(!before.running);
    assert_eq!(before.state, "offline");
    assert_eq!(before.guild_count, 0);

    sup.start(config("abc.def")).await.unwrap();
    let connecting = sup.status();
    assert!(connecting.running);
    assert_eq!(connecting.state, "connecting");

    connector.connection(0).set_ready();
    assert!(eventually(|| sup.status().state == "online").await);
    let online = sup.status();
    assert_eq!(online.latency_ms, 42);
    assert_eq!(online.member_count, 10);
    assert_eq!(online.uptime_ms, 75_000);
    assert_eq!(online.id.as_deref(), Some(common::BOT_ID));
}

#[tokio::test]
async fn status_reports_the_started_application_id() {
    let connector = ScriptedConnector::new(vec![]);
    let sup = supervisor(Arc::clone(&connector));
    let mut bot = config("abc.def");
    bot.application_id = Some("app-123".into());

    sup.start(bot).await.unwrap();
    assert_eq!(sup.status().application_id.as_deref(), Some("app-123"));

    sup.stop().await;
    assert_eq!(sup.status().application_id, None);
}

#[tokio::test(start_paused = true)]
async fn readiness_deadline_degrades_without_teardown() {
    let connector = ScriptedConnector::new(vec![]);
    let sup = supervisor(Arc::clone(&connector));
    sup.start(config("abc.def")).await.unwrap();

    tokio::time::sleep(Duration::from_secs(21)).await;
    let degraded = sup.status();
    assert!(degraded.running);
    assert_eq!(degraded.state, "error");
    assert_eq!(sup.state(), ConnectionState::Degraded);
    assert_eq!(connector.connection(0).disconnect_count(), 0);

    connector.connection(0).set_ready();
    assert!(eventually(|| sup.state() == ConnectionState::Operational).await);
}

#[tokio::test(start_paused = true)]
async fn deadline_promotes_a_ready_snapshot() {
    let connector = ScriptedConnector::new(vec![]);
    let sup = supervisor(Arc::clone(&connector));
    sup.start(config("abc.def")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(sup.state(), ConnectionState::Connecting);

    connector.connection(0).set_ready_without_event();
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(sup.state(), ConnectionState::Operational);
    assert_eq!(sup.status().state, "online");
}

#[tokio::test(start_paused = true)]
async fn error_before_ready_degrades() {
    let connector = ScriptedConnector::new(vec![]);
    let sup = supervisor(Arc::clone(&connector));
    sup.start(config("abc.def")).await.unwrap();

    connector
        .connection(0)
        .emit(GatewayEvent::Error("gateway hiccup".into()));
    assert!(eventually(|| sup.state() == ConnectionState::Degraded).await);
    assert_eq!(connector.connection(0).disconnect_count(), 0);
}

#[tokio::test]
async fn ready_before_subscription_is_not_missed() {
    let connector = ScriptedConnector::already_ready();
    let sup = supervisor(Arc::clone(&connector));
    sup.start(config("abc.def")).await.unwrap();

    assert!(eventually(|| sup.status().state == "online").await);
}

#[tokio::test(start_paused = true)]
async fn fatal_close_releases_the_connection() {
    let connector = ScriptedConnector::new(vec![]);
    let sup = supervisor(Arc::clone(&connector));
    sup.start(config("abc.def")).await.unwrap();
    let conn = connector.connection(0);
    conn.set_ready();
    assert!(eventually(|| sup.state() == ConnectionState::Operational).await);

    conn.emit(GatewayEvent::Closed {
        fatal: false,
        reason: "resumable".into(),
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sup.state(), ConnectionState::Operational);

    conn.emit(GatewayEvent::Closed {
        fatal: true,
        reason: "4004".into(),
    });
    assert!(eventually(|| sup.state() == ConnectionState::Absent).await);
    assert_eq!(conn.disconnect_count(), 1);
    assert!(!sup.stop().await.success);
}

#[tokio::test]
async fn restart_replaces_the_previous_connection() {
    let connector = ScriptedConnector::new(vec![]);
    let sup = supervisor(Arc::clone(&connector));

    sup.start(config("abc.def")).await.unwrap();
    let report = sup.start(config("abc.def")).await.unwrap();

    assert!(report.logs[0].contains("Stopping existing bot instance"));
    assert_eq!(connector.connection(0).disconnect_count(), 1);
    assert_eq!(connector.connection(1).disconnect_count(), 0);
    assert!(sup.status().running);
}

#[tokio::test]
async fn concurrent_starts_leave_one_live_connection() {
    let connector = ScriptedConnector::new(vec![]);
    let sup = supervisor(Arc::clone(&connector));

    let (a, b) = tokio::join!(sup.start(config("abc.def")), sup.start(config("ghi.jkl")));
    assert!(a.is_ok());
    assert!(b.is_ok());

    assert_eq!(connector.created_count(), 2);
    let live = (0..2)
        .filter(|i| connector.connection(*i).disconnect_count() == 0)
        .count();
    assert_eq!(live, 1);
    assert!(sup.status().running);
}

#[tokio::test]
async fn stop_during_start_discards_the_candidate() {
    let gate = Arc::new(Notify::new());
    let connector = ScriptedConnector::new(vec![Outcome::WaitFor(Arc::clone(&gate))]);
    let sup = Arc::new(supervisor(Arc::clone(&connector)));

    let starting = tokio::spawn({
        let sup = Arc::clone(&sup);
        async move { sup.start(config("abc.def")).await }
    });
    assert!(eventually(|| connector.created_count() == 1).await);

    assert!(!sup.stop().await.success);
    gate.notify_one();

    let failure = starting.await.unwrap().unwrap_err();
    assert!(matches!(failure.error, Error::AttemptsExhausted { .. }));
    assert_eq!(connector.connection(0).disconnect_count(), 1);
    assert_eq!(sup.state(), ConnectionState::Absent);
}

#[tokio::test]
async fn committed_connection_answers_commands() {
    let connector = ScriptedConnector::new(vec![]);
    let sup = supervisor(Arc::clone(&connector));
    sup.start(config("abc.def")).await.unwrap();
    let conn = connector.connection(0);

    conn.emit(GatewayEvent::Message(message("1", "!ping")));
    assert!(eventually(|| !conn.sent().is_empty()).await);
    let sent = conn.sent();
    assert_eq!(sent[0].content, "🏓 Pong! Latency: 42ms");
    assert_eq!(sent[0].reply_to.as_deref(), Some("m1"));

    sup.stop().await;
    conn.emit(GatewayEvent::Message(message("1", "!ping")));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(conn.sent().len(), 1);
}

#[tokio::test]
async fn shutdown_stops_the_connection() {
    let connector = ScriptedConnector::new(vec![]);
    let sup = supervisor(Arc::clone(&connector));
    sup.start(config("abc.def")).await.unwrap();

    sup.shutdown().await;
    assert_eq!(connector.connection(0).disconnect_count(), 1);
    assert_eq!(sup.state(), ConnectionState::Absent);
}
