//! Redis integration tests
//!
//! These tests require:
//! - Running Redis instance
//! - Environment variable: REDIS_URL
//!
//! Each test works in its own namespace and clears it at the end.
//!
//! Run with: cargo test -p integration-tests --test redis_tests

use std::sync::Arc;
use std::time::Duration;

use integration_tests::{assert_index_duality, drain, redis_pool, unique_namespace};
use rooms_adapter::{AdapterConfig, ReconcileOutcome, RoomsAdapter};
use rooms_core::{
    BroadcastOptions, DispatchMethod, LocalConnections, MembershipStore, Relay, RoomAdapter,
};
use rooms_gateway::connection::ConnectionManager;
use rooms_gateway::protocol::ServerFrame;
use rooms_store::{relay_channel, PubSubRelay, RedisMembershipStore, RelayListener};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;

const RECEIVE_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_membership_round_trip() {
    let Some(pool) = redis_pool().await else {
        return;
    };
    let ns = unique_namespace("redis-membership");
    let store = RedisMembershipStore::connect(pool, &ns).await.unwrap();

    store.add("c1", "r1").await.unwrap();
    store.add("c1", "r2").await.unwrap();
    store.add("c1", "r2").await.unwrap();
    store.add("c2", "r1").await.unwrap();
    assert_index_duality(&store).await.unwrap();

    let mut rooms = store.rooms_of("c1").await.unwrap();
    rooms.sort();
    assert_eq!(rooms, vec!["r1", "r2"]);
    assert_eq!(store.room_size("r1").await.unwrap(), 2);

    let mut all_rooms = store.all_rooms().await.unwrap();
    all_rooms.sort();
    assert_eq!(all_rooms, vec!["r1", "r2"]);

    store.remove("c1", &["r1".to_string()]).await.unwrap();
    assert_eq!(store.clients("r1").await.unwrap(), vec!["c2"]);
    assert_index_duality(&store).await.unwrap();

    assert_eq!(store.clear().await.unwrap(), 4);
    assert!(store.all_connections().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_scripts_remove_both_sides() {
    let Some(pool) = redis_pool().await else {
        return;
    };
    let store = RedisMembershipStore::connect(pool, &unique_namespace("redis-scripts"))
        .await
        .unwrap();

    for (id, room) in [("c1", "r"), ("c2", "r"), ("c1", "keep"), ("c3", "other")] {
        store.add(id, room).await.unwrap();
    }

    store
        .empty_rooms(&["r".to_string(), "missing".to_string()])
        .await
        .unwrap();
    assert_eq!(store.room_size("r").await.unwrap(), 0);
    assert_eq!(store.rooms_of("c1").await.unwrap(), vec!["keep"]);
    assert!(store.rooms_of("c2").await.unwrap().is_empty());

    store.remove_connections(&["c3".to_string()]).await.unwrap();
    assert_eq!(store.room_size("other").await.unwrap(), 0);
    assert_index_duality(&store).await.unwrap();

    store.clear().await.unwrap();
}

#[tokio::test]
async fn test_flushed_script_cache_is_recovered() {
    let Some(pool) = redis_pool().await else {
        return;
    };
    let store = RedisMembershipStore::connect(pool.clone(), &unique_namespace("redis-flush"))
        .await
        .unwrap();
    store.add("c1", "r").await.unwrap();

    let mut conn = pool.get().await.unwrap();
    redis::cmd("SCRIPT")
        .arg("FLUSH")
        .query_async::<()>(&mut conn)
        .await
        .unwrap();
    drop(conn);

    store.remove_connections(&["c1".to_string()]).await.unwrap();
    assert_eq!(store.room_size("r").await.unwrap(), 0);

    store.clear().await.unwrap();
}

#[tokio::test]
async fn test_namespace_switch_reregisters_scripts() {
    let Some(pool) = redis_pool().await else {
        return;
    };
    let first = unique_namespace("redis-ns-a");
    let second = unique_namespace("redis-ns-b");
    let store = RedisMembershipStore::connect(pool.clone(), &first).await.unwrap();
    let observer = RedisMembershipStore::connect(pool, &first).await.unwrap();

    store.add("c1", "r").await.unwrap();
    store.set_namespace(&second).await.unwrap();
    store.add("c1", "r").await.unwrap();
    store.empty_rooms(&["r".to_string()]).await.unwrap();

    // Only the second namespace was emptied
    assert_eq!(observer.clients("r").await.unwrap(), vec!["c1"]);
    assert_eq!(store.room_size("r").await.unwrap(), 0);

    observer.clear().await.unwrap();
    store.clear().await.unwrap();
}

#[tokio::test]
async fn test_two_adapters_reconcile_independently() {
    let Some(pool) = redis_pool().await else {
        return;
    };
    let ns = unique_namespace("redis-reconcile");

    let leaving_manager = ConnectionManager::new_shared();
    let leaving = RoomsAdapter::new(
        Arc::new(RedisMembershipStore::connect(pool.clone(), &ns).await.unwrap()),
        AdapterConfig::default()
            .with_namespace(ns.as_str())
            .with_enumerator(leaving_manager.clone())
            .with_host(leaving_manager.clone())
            .with_remove_clients_on_exit(true),
    )
    .await
    .unwrap();
    let staying = RoomsAdapter::new(
        Arc::new(RedisMembershipStore::connect(pool, &ns).await.unwrap()),
        AdapterConfig::default().with_namespace(ns.as_str()),
    )
    .await
    .unwrap();

    let (tx, _rx) = mpsc::channel(8);
    leaving_manager.add_connection("c1".to_string(), tx, None);
    leaving.add("c1", "lobby").await.unwrap();
    staying.add("c2", "lobby").await.unwrap();

    assert_eq!(
        leaving.shutdown().await.unwrap(),
        ReconcileOutcome::Removed(1)
    );
    assert_eq!(staying.clients("lobby").await.unwrap(), vec!["c2"]);

    staying.clear().await.unwrap();
}

#[tokio::test]
async fn test_pubsub_relay_reaches_other_process() {
    let Some(pool) = redis_pool().await else {
        return;
    };
    let ns = unique_namespace("redis-relay");
    let store = Arc::new(RedisMembershipStore::connect(pool.clone(), &ns).await.unwrap());
    let keyspace = store.keyspace();
    let channel = relay_channel(&keyspace);

    // Receiving process: holds `remote`, subscribed to the relay channel
    let remote_manager = ConnectionManager::new_shared();
    let (remote_tx, mut remote_rx) = mpsc::channel(8);
    remote_manager.add_connection("remote".to_string(), remote_tx, None);
    let listener = RelayListener::spawn(
        pool.url(),
        &channel,
        remote_manager.clone() as Arc<dyn LocalConnections>,
    )
    .await
    .unwrap();

    // Sending process: holds `local`, broadcasts through the relay
    let relay: Arc<dyn Relay> = Arc::new(PubSubRelay::new(pool, &keyspace, "sender"));
    let local_manager = ConnectionManager::new_shared();
    let (local_tx, mut local_rx) = mpsc::channel(8);
    local_manager.add_connection("local".to_string(), local_tx, Some(relay));

    let config = AdapterConfig::default()
        .with_namespace(ns.as_str())
        .with_relay(true);
    let adapter = RoomsAdapter::new(store, config).await.unwrap();
    adapter.add("local", "lobby").await.unwrap();
    adapter.add("remote", "lobby").await.unwrap();

    let opts = BroadcastOptions::to_rooms(["lobby"])
        .except("local")
        .method(DispatchMethod::Send);
    let report = adapter
        .broadcast(
            &[json!({ "event": "chat", "data": "hello" })],
            &opts,
            local_manager.as_ref(),
        )
        .await
        .unwrap();
    assert!(report.relayed);

    let frame = timeout(RECEIVE_TIMEOUT, remote_rx.recv())
        .await
        .expect("relay delivery timed out")
        .unwrap();
    assert_eq!(
        frame,
        ServerFrame::Event {
            name: "chat".into(),
            data: json!("hello")
        }
    );
    assert!(drain(&mut local_rx).is_empty());

    listener.stop().await;
    adapter.clear().await.unwrap();
}
