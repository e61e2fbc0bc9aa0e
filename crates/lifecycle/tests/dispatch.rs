#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::{Arc, atomic::Ordering};

use {
    botdeck_channels::{GatewayConnection, GatewayEvent},
    botdeck_lifecycle::{
        CommandDispatcher, Error,
        dispatcher::{APOLOGY, process_memory_mb},
    },
    common::{BOT_ID, FakeConnection, Outcome, builtins, config, eventually, message},
    rstest::rstest,
};

fn dispatcher_with(prefix: &str) -> (CommandDispatcher, Arc<FakeConnection>) {
    let conn = Arc::new(FakeConnection::new(Outcome::Succeed));
    let mut cfg = config("abc.def");
    cfg.prefix = prefix.into();
    let dispatcher = CommandDispatcher::new(&cfg, builtins(), conn.clone());
    (dispatcher, conn)
}

fn dispatcher() -> (CommandDispatcher, Arc<FakeConnection>) {
    dispatcher_with("!")
}

#[rstest]
#[case("!ping")]
#[case("!PING")]
#[case("!  ping extra args")]
fn ping_reports_latency(#[case] content: &str) {
    let (d, _) = dispatcher();
    assert_eq!(
        d.on_message(&message("1", content)).as_deref(),
        Some("🏓 Pong! Latency: 42ms")
    );
}

#[test]
fn unknown_command_gets_fallback() {
    let (d, _) = dispatcher();
    assert_eq!(
        d.on_message(&message("1", "!dance")).as_deref(),
        Some("❓ Unknown command: `dance`. Use `!help` to see available commands.")
    );
}

#[test]
fn bare_prefix_names_empty_command() {
    let (d, _) = dispatcher();
    assert_eq!(
        d.on_message(&message("1", "!")).as_deref(),
        Some("❓ Unknown command: ``. Use `!help` to see available commands.")
    );
}

#[rstest]
#[case::no_prefix("ping")]
#[case::prefix_not_at_start("hey !ping")]
#[case::empty("")]
fn messages_without_prefix_are_ignored(#[case] content: &str) {
    let (d, _) = dispatcher();
    assert!(d.on_message(&message("1", content)).is_none());
}

#[test]
fn own_messages_are_ignored() {
    let (d, _) = dispatcher();
    assert!(d.on_message(&message(BOT_ID, "!ping")).is_none());
}

#[test]
fn other_bots_are_ignored() {
    let (d, _) = dispatcher();
    let mut msg = message("2", "!ping");
    msg.author.bot = true;
    assert!(d.on_message(&msg).is_none());
}

#[test]
fn hello_greets_by_display_name() {
    let (d, _) = dispatcher();
    assert_eq!(
        d.on_message(&message("1", "!hello")).as_deref(),
        Some("👋 Hello Alice! I'm online and ready!")
    );
}

#[test]
fn test_command_confirms_liveness() {
    let (d, _) = dispatcher();
    assert_eq!(
        d.on_message(&message("1", "!test")).as_deref(),
        Some("✅ Bot is working correctly!")
    );
}

#[test]
fn info_lists_counts_and_prefix() {
    let (d, _) = dispatcher();
    let reply = d.on_message(&message("1", "!info")).unwrap();
    assert!(reply.contains("**Bot Name:** panel-bot"), "{reply}");
    assert!(reply.contains("**Servers:** 2"), "{reply}");
    assert!(reply.contains("**Users:** 10"), "{reply}");
    assert!(reply.contains("**Uptime:** 1m 15s"), "{reply}");
    assert!(reply.contains("**Ping:** 42ms"), "{reply}");
    assert!(reply.contains("**Prefix:** !"), "{reply}");
}

#[test]
fn status_includes_memory() {
    let (d, _) = dispatcher();
    let reply = d.on_message(&message("1", "!status")).unwrap();
    assert!(reply.contains("🟢 Online"), "{reply}");
    assert!(reply.contains("MB"), "{reply}");
    assert!(reply.contains("**Guilds:** 2"), "{reply}");
}

fn memory_unavailable() -> botdeck_lifecycle::Result<u64> {
    Err(Error::DispatchHandlerError {
        command: "status".into(),
        message: "process table unreadable".into(),
    })
}

#[test]
fn status_failure_apologises() {
    let (d, _) = dispatcher();
    let d = d.with_memory_reader(memory_unavailable);
    assert_eq!(d.on_message(&message("1", "!status")).unwrap(), APOLOGY);
}

#[test]
fn status_uses_the_reported_memory() {
    let (d, _) = dispatcher();
    let d = d.with_memory_reader(|| Ok(64));
    let reply = d.on_message(&message("1", "!status")).unwrap();
    assert!(reply.contains("**Memory Usage:** 64MB"), "{reply}");
    assert!(process_memory_mb().is_ok());
}

#[tokio::test]
async fn handler_failure_does_not_stop_serving() {
    let (d, conn) = dispatcher();
    let d = d.with_memory_reader(memory_unavailable);
    let task = tokio::spawn(d.run(conn.subscribe()));

    conn.emit(GatewayEvent::Message(message("1", "!status")));
    conn.emit(GatewayEvent::Message(message("1", "!ping")));
    assert!(eventually(|| conn.sent().len() == 2).await);
    task.abort();

    let sent = conn.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].content, APOLOGY);
    assert_eq!(sent[0].reply_to.as_deref(), Some("m1"));
    assert!(sent[1].content.starts_with("🏓 Pong!"), "{}", sent[1].content);
}

#[test]
fn help_uses_configured_prefix() {
    let (d, _) = dispatcher_with("?");
    let reply = d.on_message(&message("1", "?help")).unwrap();
    assert!(reply.contains("prefix `?`"), "{reply}");
    assert!(reply.contains("`?ping` - Check bot latency"), "{reply}");
    assert!(!reply.contains("`!ping`"), "{reply}");
}

#[test]
fn disabled_commands_fall_back() {
    let conn = Arc::new(FakeConnection::new(Outcome::Succeed));
    let mut commands = builtins();
    for cmd in &mut commands {
        if cmd.name == "ping" {
            cmd.enabled = false;
        }
    }
    let d = CommandDispatcher::new(&config("abc.def"), commands, conn);

    let reply = d.on_message(&message("1", "!ping")).unwrap();
    assert!(reply.starts_with("❓ Unknown command: `ping`"), "{reply}");
    let help = d.on_message(&message("1", "!help")).unwrap();
    assert!(!help.contains("`!ping`"), "{help}");
}

#[tokio::test]
async fn handle_replies_to_the_source_message() {
    let (d, conn) = dispatcher();
    d.handle(message("1", "!test")).await;

    let sent = conn.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].channel_id, "c1");
    assert_eq!(sent[0].reply_to.as_deref(), Some("m1"));
    assert_eq!(sent[0].content, "✅ Bot is working correctly!");
}

#[tokio::test]
async fn send_failures_are_swallowed() {
    let (d, conn) = dispatcher();
    conn.fail_sends.store(true, Ordering::SeqCst);

    d.handle(message("1", "!ping")).await;
    d.handle(message("1", "!hello")).await;
    assert!(conn.sent().is_empty());
}
