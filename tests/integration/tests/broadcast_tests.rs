//! Broadcast integration tests
//!
//! Connections from the shared layout are spread over two nodes: alice and bob
//! on the first, carol and dave on the second.
//!
//! Run with: cargo test -p integration-tests --test broadcast_tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use integration_tests::{
    chat_payload, drain, message_frame, unique_namespace, Cluster, TestNode, LAYOUT,
};
use rooms_core::{BroadcastOptions, BroadcastReport, DispatchMethod, RoomAdapter, Transformer};
use rooms_gateway::protocol::ServerFrame;
use serde_json::{json, Value};
use tokio::sync::mpsc;

type Inboxes = HashMap<&'static str, mpsc::Receiver<ServerFrame>>;

/// Two nodes on one namespace with the layout joined
async fn two_nodes(cluster: &Cluster) -> (TestNode, TestNode, Inboxes) {
    let ns = unique_namespace("broadcast");
    let first = cluster.node(&ns).await.unwrap();
    let second = cluster.node(&ns).await.unwrap();

    let mut inboxes = HashMap::new();
    for (id, rooms) in LAYOUT {
        let node = if matches!(id, "alice" | "bob") {
            &first
        } else {
            &second
        };
        inboxes.insert(id, node.join(id, rooms).await.unwrap());
    }
    (first, second, inboxes)
}

fn received(inboxes: &mut Inboxes, id: &str) -> Vec<ServerFrame> {
    drain(inboxes.get_mut(id).unwrap())
}

// ============================================================================
// Local delivery
// ============================================================================

#[tokio::test]
async fn test_union_reaches_each_local_connection_once() {
    let cluster = Cluster::new();
    let (first, _second, mut inboxes) = two_nodes(&cluster).await;

    let report = first
        .adapter
        .broadcast(
            &[chat_payload("hi")],
            &BroadcastOptions::to_rooms(["lobby", "games"]),
            first.manager.as_ref(),
        )
        .await
        .unwrap();

    // carol is in `games` but lives on the other node
    assert_eq!(report.targeted, 3);
    assert_eq!(report.delivered, 2);
    assert_eq!(report.dropped, 1);

    let expected = vec![message_frame(chat_payload("hi"))];
    assert_eq!(received(&mut inboxes, "alice"), expected);
    assert_eq!(received(&mut inboxes, "bob"), expected);
    assert!(received(&mut inboxes, "carol").is_empty());
    assert!(received(&mut inboxes, "dave").is_empty());
}

#[tokio::test]
async fn test_except_is_exact() {
    let cluster = Cluster::new();
    let (first, _second, mut inboxes) = two_nodes(&cluster).await;

    let opts = BroadcastOptions::to_rooms(["lobby"]).except("bob").except("bo");
    let report = first
        .adapter
        .broadcast(&[json!(1)], &opts, first.manager.as_ref())
        .await
        .unwrap();

    assert_eq!(report.targeted, 1);
    assert_eq!(received(&mut inboxes, "alice"), vec![message_frame(json!(1))]);
    assert!(received(&mut inboxes, "bob").is_empty());
}

#[tokio::test]
async fn test_no_rooms_reaches_every_connection() {
    let cluster = Cluster::new();
    let (_first, second, mut inboxes) = two_nodes(&cluster).await;

    let report = second
        .adapter
        .broadcast(
            &[json!("all")],
            &BroadcastOptions::everyone(),
            second.manager.as_ref(),
        )
        .await
        .unwrap();

    assert_eq!(report.targeted, 4);
    assert_eq!(report.delivered, 2);
    for id in ["carol", "dave"] {
        assert_eq!(received(&mut inboxes, id), vec![message_frame(json!("all"))]);
    }
}

#[tokio::test]
async fn test_send_delivers_events() {
    let cluster = Cluster::new();
    let (first, _second, mut inboxes) = two_nodes(&cluster).await;

    let opts = BroadcastOptions::to_rooms(["lobby"])
        .method(DispatchMethod::Send)
        .transformer(Transformer::new(|args| {
            json!({ "event": "chat", "data": args.to_vec() })
        }));
    first
        .adapter
        .broadcast(&[json!("a"), json!("b")], &opts, first.manager.as_ref())
        .await
        .unwrap();

    assert_eq!(
        received(&mut inboxes, "alice"),
        vec![ServerFrame::Event {
            name: "chat".into(),
            data: json!(["a", "b"])
        }]
    );
}

#[tokio::test]
async fn test_transformer_runs_once_per_broadcast() {
    let cluster = Cluster::new();
    let (first, _second, mut inboxes) = two_nodes(&cluster).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let opts = BroadcastOptions::everyone().transformer(Transformer::new(move |args| {
        counter.fetch_add(1, Ordering::SeqCst);
        args.first().cloned().unwrap_or(Value::Null)
    }));

    first
        .adapter
        .broadcast(&[json!("x")], &opts, first.manager.as_ref())
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(received(&mut inboxes, "bob").len(), 1);
}

#[tokio::test]
async fn test_empty_target_set_sends_nothing() {
    let cluster = Cluster::new();
    let (first, _second, mut inboxes) = two_nodes(&cluster).await;

    let report = first
        .adapter
        .broadcast(
            &[json!("x")],
            &BroadcastOptions::to_rooms(["nobody-here"]),
            first.manager.as_ref(),
        )
        .await
        .unwrap();

    assert_eq!(report, BroadcastReport::default());
    assert!(received(&mut inboxes, "alice").is_empty());
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_scan_failure_degrades_to_no_sends() {
    let cluster = Cluster::new();
    let (first, _second, mut inboxes) = two_nodes(&cluster).await;
    cluster.backend().set_available(false);

    let report = first
        .adapter
        .broadcast(&[json!("x")], &BroadcastOptions::everyone(), first.manager.as_ref())
        .await
        .unwrap();

    assert_eq!(report, BroadcastReport::default());
    assert!(received(&mut inboxes, "alice").is_empty());
}

#[tokio::test]
async fn test_room_lookup_failure_propagates() {
    let cluster = Cluster::new();
    let (first, _second, _inboxes) = two_nodes(&cluster).await;
    cluster.backend().set_available(false);

    let result = first
        .adapter
        .broadcast(
            &[json!("x")],
            &BroadcastOptions::to_rooms(["lobby"]),
            first.manager.as_ref(),
        )
        .await;

    assert!(result.unwrap_err().is_transport());
}

// ============================================================================
// Relay mode
// ============================================================================

#[tokio::test]
async fn test_relay_reaches_connections_on_other_nodes() {
    let cluster = Cluster::with_relay();
    let (first, _second, mut inboxes) = two_nodes(&cluster).await;

    let opts = BroadcastOptions::to_rooms(["lobby", "games"]).except("alice");
    let report = first
        .adapter
        .broadcast(&[chat_payload("hey")], &opts, first.manager.as_ref())
        .await
        .unwrap();

    assert!(report.relayed);
    assert_eq!(report.targeted, 2);

    let envelopes = cluster.relay().unwrap().envelopes();
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].ids, vec!["bob", "carol"]);

    let expected = vec![message_frame(chat_payload("hey"))];
    assert_eq!(received(&mut inboxes, "bob"), expected);
    assert_eq!(received(&mut inboxes, "carol"), expected);
    assert!(received(&mut inboxes, "alice").is_empty());
    assert!(received(&mut inboxes, "dave").is_empty());
}

#[tokio::test]
async fn test_relay_with_no_local_connections_is_noop() {
    let cluster = Cluster::with_relay();
    let (first, _second, mut inboxes) = two_nodes(&cluster).await;
    let idle = cluster
        .node(&first.adapter.config_snapshot().namespace)
        .await
        .unwrap();

    let report = idle
        .adapter
        .broadcast(&[json!("x")], &BroadcastOptions::everyone(), idle.manager.as_ref())
        .await
        .unwrap();

    assert!(!report.relayed);
    assert_eq!(report.targeted, 4);
    assert!(cluster.relay().unwrap().envelopes().is_empty());
    assert!(received(&mut inboxes, "carol").is_empty());
}
