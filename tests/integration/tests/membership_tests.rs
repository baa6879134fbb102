//! Membership integration tests
//!
//! Several nodes share one in-memory store server, so every operation is
//! observed from a node other than the one that issued it.
//!
//! Run with: cargo test -p integration-tests --test membership_tests

use integration_tests::{assert_index_duality, unique_namespace, Cluster};
use rooms_adapter::ConfigUpdate;
use rooms_core::{MembershipStore, RoomAdapter, StoreError};
use rooms_store::MemoryMembershipStore;

// ============================================================================
// Index duality
// ============================================================================

#[tokio::test]
async fn test_duality_holds_across_nodes() {
    let cluster = Cluster::new();
    let ns = unique_namespace("duality");
    let a = cluster.node(&ns).await.unwrap();
    let b = cluster.node(&ns).await.unwrap();

    a.adapter.add("c1", "r1").await.unwrap();
    b.adapter.add("c1", "r2").await.unwrap();
    b.adapter.add("c2", "r1").await.unwrap();
    assert_index_duality(a.store().as_ref()).await.unwrap();

    a.adapter.del("c1", Some("r1")).await.unwrap();
    assert_index_duality(b.store().as_ref()).await.unwrap();

    assert_eq!(b.adapter.get(Some("c1")).await.unwrap(), vec!["r2"]);
    assert_eq!(a.adapter.clients("r1").await.unwrap(), vec!["c2"]);
}

#[tokio::test]
async fn test_rejoin_is_idempotent() {
    let cluster = Cluster::new();
    let ns = unique_namespace("rejoin");
    let a = cluster.node(&ns).await.unwrap();
    let b = cluster.node(&ns).await.unwrap();

    a.adapter.add("c1", "r").await.unwrap();
    b.adapter.set("c1", "r").await.unwrap();

    assert_eq!(a.adapter.get(Some("c1")).await.unwrap(), vec!["r"]);
    assert_eq!(a.adapter.clients("r").await.unwrap(), vec!["c1"]);
}

#[tokio::test]
async fn test_full_removal_clears_both_sides() {
    let cluster = Cluster::new();
    let ns = unique_namespace("removal");
    let a = cluster.node(&ns).await.unwrap();
    let b = cluster.node(&ns).await.unwrap();

    for room in ["r1", "r2", "r3"] {
        a.adapter.add("c1", room).await.unwrap();
    }
    a.adapter.add("c2", "r2").await.unwrap();

    b.adapter.del("c1", None).await.unwrap();

    assert!(a.adapter.get(Some("c1")).await.unwrap().is_empty());
    for room in ["r1", "r3"] {
        assert!(a.adapter.is_empty(room).await.unwrap());
    }
    assert_eq!(a.adapter.clients("r2").await.unwrap(), vec!["c2"]);
    assert_index_duality(a.store().as_ref()).await.unwrap();
}

#[tokio::test]
async fn test_empty_room_string_removes_everything() {
    let cluster = Cluster::new();
    let node = cluster.node(&unique_namespace("blank")).await.unwrap();

    node.adapter.add("c1", "r1").await.unwrap();
    node.adapter.add("c1", "r2").await.unwrap();
    node.adapter.del("c1", Some("")).await.unwrap();

    assert!(node.adapter.get(Some("c1")).await.unwrap().is_empty());
}

// ============================================================================
// Rooms
// ============================================================================

#[tokio::test]
async fn test_empty_removes_rooms_atomically() {
    let cluster = Cluster::new();
    let ns = unique_namespace("empty");
    let a = cluster.node(&ns).await.unwrap();
    let b = cluster.node(&ns).await.unwrap();

    a.adapter.add("c1", "r").await.unwrap();
    a.adapter.add("c1", "keep").await.unwrap();
    b.adapter.add("c2", "r").await.unwrap();
    b.adapter.add("c3", "other").await.unwrap();

    b.adapter.empty(["r", "other"].into()).await.unwrap();

    assert!(a.adapter.is_empty("r").await.unwrap());
    assert!(a.adapter.is_empty("other").await.unwrap());
    assert_eq!(a.adapter.get(Some("c1")).await.unwrap(), vec!["keep"]);
    assert!(a.adapter.get(Some("c2")).await.unwrap().is_empty());
    assert_index_duality(a.store().as_ref()).await.unwrap();
}

#[tokio::test]
async fn test_rooms_listing_and_emptiness() {
    let cluster = Cluster::new();
    let node = cluster.node(&unique_namespace("listing")).await.unwrap();

    assert!(node.adapter.get(None).await.unwrap().is_empty());
    assert!(node.adapter.is_empty("never-used").await.unwrap());

    node.adapter.add("c1", "b-room").await.unwrap();
    node.adapter.add("c2", "a-room").await.unwrap();

    let mut rooms = node.adapter.get(None).await.unwrap();
    rooms.sort();
    assert_eq!(rooms, vec!["a-room", "b-room"]);
    assert!(!node.adapter.is_empty("a-room").await.unwrap());
}

#[tokio::test]
async fn test_clear_wipes_namespace_for_every_node() {
    let cluster = Cluster::new();
    let ns = unique_namespace("clear");
    let a = cluster.node(&ns).await.unwrap();
    let b = cluster.node(&ns).await.unwrap();

    a.adapter.add("c1", "r").await.unwrap();
    b.adapter.add("c2", "r").await.unwrap();

    let deleted = a.adapter.clear().await.unwrap();

    assert_eq!(deleted, 3);
    assert!(b.adapter.get(None).await.unwrap().is_empty());
    assert!(cluster.backend().keys().is_empty());
}

// ============================================================================
// Namespaces
// ============================================================================

#[tokio::test]
async fn test_namespaces_are_isolated() {
    let cluster = Cluster::new();
    let chat = cluster.node(&unique_namespace("chat")).await.unwrap();
    let game = cluster.node(&unique_namespace("game")).await.unwrap();

    chat.adapter.add("c1", "lobby").await.unwrap();
    game.adapter.add("c1", "lobby").await.unwrap();
    game.adapter.add("c2", "arena").await.unwrap();

    chat.adapter.del("c1", None).await.unwrap();
    chat.adapter.clear().await.unwrap();

    assert_eq!(game.adapter.clients("lobby").await.unwrap(), vec!["c1"]);
    let mut rooms = game.adapter.get(None).await.unwrap();
    rooms.sort();
    assert_eq!(rooms, vec!["arena", "lobby"]);
}

#[tokio::test]
async fn test_namespace_switch_moves_the_view() {
    let cluster = Cluster::new();
    let first = unique_namespace("first");
    let second = unique_namespace("second");
    let node = cluster.node(&first).await.unwrap();
    let observer = cluster.node(&second).await.unwrap();

    node.adapter.add("c1", "r").await.unwrap();
    node.adapter
        .config(ConfigUpdate::new().namespace(second.as_str()))
        .await
        .unwrap();

    assert!(node.adapter.get(Some("c1")).await.unwrap().is_empty());
    node.adapter.add("c2", "r").await.unwrap();
    assert_eq!(observer.adapter.clients("r").await.unwrap(), vec!["c2"]);
    assert_eq!(node.adapter.config_snapshot().namespace, second);
}

#[tokio::test]
async fn test_invalid_namespace_rejected() {
    let cluster = Cluster::new();

    for bad in ["", "chat*", "a:b", "it's", "two\nlines"] {
        let result = MemoryMembershipStore::new(cluster.backend().clone(), bad);
        assert!(matches!(result, Err(StoreError::InvalidNamespace(_))), "{bad:?}");
    }

    let node = cluster.node(&unique_namespace("valid")).await.unwrap();
    let err = node
        .adapter
        .config(ConfigUpdate::new().namespace("bad?"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidNamespace(_)));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_transport_failure_propagates() {
    let cluster = Cluster::new();
    let node = cluster.node(&unique_namespace("down")).await.unwrap();
    cluster.backend().set_available(false);

    let err = node.adapter.add("c1", "r").await.unwrap_err();
    assert!(err.is_transport());
    assert!(node.adapter.clients("r").await.is_err());
    assert!(node.adapter.del("c1", None).await.is_err());

    cluster.backend().set_available(true);
    assert!(node.store().all_connections().await.unwrap().is_empty());
}
