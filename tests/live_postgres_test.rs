//! Integration tests against a live PostgreSQL server
//!
//! These tests subscribe to real channels and need a reachable database;
//! they are ignored unless run explicitly with DATABASE_URL set.

use std::time::Duration;

use pgsignal::prelude::*;
use sqlx::PgPool;

async fn setup_pool(database_url: &str) -> PgPool {
    PgPool::connect(database_url)
        .await
        .expect("Failed to connect to database")
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL server via DATABASE_URL"]
async fn notifications_are_bridged_to_signal_numbers() {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

    let config = BridgeConfig::new(1, vec![format!("42 pgsignal_it \"{}\"", database_url)]);
    let (sink, mut signals) = ChannelSignalSink::new();
    let bridge = SignalBridge::with_sink(&config, Box::new(sink)).expect("valid configuration");
    let bridge_task = tokio::spawn(bridge.run());

    // Give the startup connection pass a moment to subscribe.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let pool = setup_pool(&database_url).await;
    for _ in 0..3 {
        sqlx::query("SELECT pg_notify('pgsignal_it', 'ping')")
            .execute(&pool)
            .await
            .expect("Failed to notify channel");
    }

    for _ in 0..3 {
        let signum = tokio::time::timeout(Duration::from_secs(5), signals.recv())
            .await
            .expect("notification within the deadline")
            .expect("bridge task alive");
        assert_eq!(signum, 42);
    }

    bridge_task.abort();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL server via DATABASE_URL"]
async fn unreachable_server_never_dispatches() {
    let config = BridgeConfig::new(
        1,
        vec!["42 orders \"postgres://nobody@127.0.0.1:1/void\"".to_string()],
    );
    let (sink, mut signals) = ChannelSignalSink::new();
    let bridge = SignalBridge::with_sink(&config, Box::new(sink)).expect("valid configuration");
    let bridge_task = tokio::spawn(bridge.run());

    let outcome = tokio::time::timeout(Duration::from_secs(3), signals.recv()).await;
    assert!(outcome.is_err(), "no signal may be raised for a dead server");

    bridge_task.abort();
}
