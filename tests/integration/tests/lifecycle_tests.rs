//! Shutdown reconciliation integration tests
//!
//! Run with: cargo test -p integration-tests --test lifecycle_tests

use std::sync::Arc;

use integration_tests::{unique_namespace, Cluster};
use parking_lot::Mutex;
use rooms_adapter::{ConfigUpdate, ReconcileOutcome, ShutdownCallback};
use rooms_core::{ConnectionEnumerator, RoomAdapter, StoreResult};

/// Callback that records every outcome it is handed
fn recording_callback() -> (ShutdownCallback, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: ShutdownCallback = Arc::new(move |outcome: &StoreResult<ReconcileOutcome>| {
        sink.lock().push(format!("{outcome:?}"));
    });
    (callback, seen)
}

#[tokio::test]
async fn test_reconciliation_only_touches_own_connections() {
    let cluster = Cluster::new();
    let ns = unique_namespace("reconcile");
    let leaving = cluster
        .node_with(&ns, |config| config.with_remove_clients_on_exit(true))
        .await
        .unwrap();
    let staying = cluster.node(&ns).await.unwrap();

    let _c1 = leaving.join("c1", &["lobby", "games"]).await.unwrap();
    let _c2 = leaving.join("c2", &["lobby"]).await.unwrap();
    let _c3 = staying.join("c3", &["lobby"]).await.unwrap();
    assert!(leaving.adapter.is_shutdown_hook_installed());

    let outcome = leaving.adapter.shutdown().await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Removed(2));
    assert_eq!(staying.adapter.clients("lobby").await.unwrap(), vec!["c3"]);
    assert!(staying.adapter.is_empty("games").await.unwrap());
    assert!(staying.adapter.get(Some("c1")).await.unwrap().is_empty());
    assert_eq!(staying.adapter.get(Some("c3")).await.unwrap(), vec!["lobby"]);
}

#[tokio::test]
async fn test_host_closes_before_reconciliation() {
    let cluster = Cluster::new();
    let ns = unique_namespace("host");
    let node = cluster
        .node_with(&ns, |config| config.with_remove_clients_on_exit(true))
        .await
        .unwrap();
    let _c1 = node.join("c1", &["r"]).await.unwrap();

    node.adapter.shutdown().await.unwrap();

    assert!(!node.manager.is_accepting());
    // Connections stay in the table until the host drops them
    assert_eq!(node.manager.connection_count(), 1);
    assert_eq!(node.manager.disconnect_all(), 1);
    assert!(node.adapter.is_empty("r").await.unwrap());
}

#[tokio::test]
async fn test_shutdown_runs_once_and_reports() {
    let cluster = Cluster::new();
    let (callback, seen) = recording_callback();
    let node = cluster
        .node_with(&unique_namespace("once"), move |config| {
            config
                .with_remove_clients_on_exit(true)
                .with_on_shutdown(callback)
        })
        .await
        .unwrap();
    let _c1 = node.join("c1", &["r"]).await.unwrap();

    let (first, second) = tokio::join!(node.adapter.shutdown(), node.adapter.shutdown());
    let mut outcomes = vec![first.unwrap(), second.unwrap()];
    outcomes.sort_by_key(|outcome| matches!(outcome, ReconcileOutcome::Skipped));

    assert_eq!(
        outcomes,
        vec![ReconcileOutcome::Removed(1), ReconcileOutcome::Skipped]
    );
    assert_eq!(seen.lock().as_slice(), ["Ok(Removed(1))"]);

    node.adapter.shutdown_complete().await;
    assert_eq!(
        node.adapter.shutdown().await.unwrap(),
        ReconcileOutcome::Skipped
    );
}

#[tokio::test]
async fn test_disabled_reconciliation_leaves_entries() {
    let cluster = Cluster::new();
    let node = cluster.node(&unique_namespace("disabled")).await.unwrap();
    let _c1 = node.join("c1", &["r"]).await.unwrap();

    assert!(!node.adapter.is_shutdown_hook_installed());
    let outcome = node.adapter.shutdown().await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Skipped);
    assert_eq!(node.adapter.clients("r").await.unwrap(), vec!["c1"]);
}

#[tokio::test]
async fn test_missing_enumerator_clears_namespace() {
    let cluster = Cluster::new();
    let ns = unique_namespace("noenum");
    let node = cluster
        .node_with(&ns, |mut config| {
            config.enumerator = None;
            config.with_remove_clients_on_exit(true)
        })
        .await
        .unwrap();
    let other = cluster.node(&ns).await.unwrap();
    let _c1 = node.join("c1", &["r"]).await.unwrap();
    let _c2 = other.join("c2", &["r"]).await.unwrap();

    // Nothing to enumerate with, so no hook either
    assert!(!node.adapter.is_shutdown_hook_installed());
    let outcome = node.adapter.shutdown().await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Cleared(3));
    assert!(other.adapter.get(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_closure_enumerator() {
    let cluster = Cluster::new();
    let ns = unique_namespace("closure");
    let enumerator: Arc<dyn ConnectionEnumerator> = Arc::new(|| vec!["c1".to_string()]);
    let node = cluster
        .node_with(&ns, move |config| {
            config
                .with_enumerator(enumerator)
                .with_remove_clients_on_exit(true)
        })
        .await
        .unwrap();

    node.adapter.add("c1", "r").await.unwrap();
    node.adapter.add("c2", "r").await.unwrap();

    assert_eq!(
        node.adapter.shutdown().await.unwrap(),
        ReconcileOutcome::Removed(1)
    );
    assert_eq!(node.adapter.clients("r").await.unwrap(), vec!["c2"]);
}

#[tokio::test]
async fn test_config_update_keeps_omitted_fields() {
    let cluster = Cluster::new();
    let ns = unique_namespace("update");
    let node = cluster.node(&ns).await.unwrap();
    assert!(!node.adapter.is_shutdown_hook_installed());

    node.adapter
        .config(ConfigUpdate::new().remove_clients_on_exit(true))
        .await
        .unwrap();

    let config = node.adapter.config_snapshot();
    assert_eq!(config.namespace, ns);
    assert!(!config.relay);
    assert!(config.remove_clients_on_exit);
    assert!(config.enumerator.is_some());
    assert!(config.host.is_some());
    assert!(node.adapter.is_shutdown_hook_installed());

    node.adapter
        .config(ConfigUpdate::new().relay(true))
        .await
        .unwrap();
    let config = node.adapter.config_snapshot();
    assert!(config.relay);
    assert!(config.remove_clients_on_exit);
    assert!(!node.adapter.install_shutdown_hook());
}
