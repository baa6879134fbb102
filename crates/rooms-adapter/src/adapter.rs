//! Store-backed room adapter.

use async_trait::async_trait;
use parking_lot::RwLock;
use rooms_core::{
    BroadcastOptions, BroadcastReport, LocalConnections, MembershipStore, RoomAdapter, RoomList,
    SegmentWildcard, StoreResult, WildcardMatcher,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

use crate::broadcast::BroadcastResolver;
use crate::config::{AdapterConfig, ConfigUpdate};
use crate::lifecycle::{
    chain_panic_hook, wait_for_trigger, ReconcileOutcome, Reconciler, ShutdownState,
    ShutdownTrigger,
};

struct AdapterInner {
    store: Arc<dyn MembershipStore>,
    config: RwLock<Arc<AdapterConfig>>,
    wildcard: Arc<dyn WildcardMatcher>,
    shutdown: ShutdownState,
}

/// Room adapter whose membership lives entirely in a [`MembershipStore`].
///
/// Cheap to clone; clones share configuration and shutdown state.
#[derive(Clone)]
pub struct RoomsAdapter {
    inner: Arc<AdapterInner>,
}

impl std::fmt::Debug for RoomsAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomsAdapter")
            .field("config", &self.config_snapshot())
            .field("hook_installed", &self.inner.shutdown.is_installed())
            .finish()
    }
}

impl RoomsAdapter {
    /// Create an adapter with the default segment wildcard matcher
    pub async fn new(store: Arc<dyn MembershipStore>, config: AdapterConfig) -> StoreResult<Self> {
        Self::with_wildcard(store, config, Arc::new(SegmentWildcard::default())).await
    }

    /// Create an adapter with a custom wildcard matcher.
    ///
    /// The store is switched to the configured namespace if it uses another one,
    /// and the shutdown hook is installed when the configuration asks for it.
    pub async fn with_wildcard(
        store: Arc<dyn MembershipStore>,
        config: AdapterConfig,
        wildcard: Arc<dyn WildcardMatcher>,
    ) -> StoreResult<Self> {
        if store.keyspace().namespace() != config.namespace {
            store.set_namespace(&config.namespace).await?;
        }

        let install = config.wants_shutdown_hook();
        let adapter = Self {
            inner: Arc::new(AdapterInner {
                store,
                config: RwLock::new(Arc::new(config)),
                wildcard,
                shutdown: ShutdownState::new(),
            }),
        };

        if install {
            adapter.install_shutdown_hook();
        }

        tracing::info!(config = ?adapter.config_snapshot(), "Room adapter created");
        Ok(adapter)
    }

    /// Current configuration
    #[must_use]
    pub fn config_snapshot(&self) -> Arc<AdapterConfig> {
        Arc::clone(&self.inner.config.read())
    }

    /// The membership store
    #[must_use]
    pub fn store(&self) -> &Arc<dyn MembershipStore> {
        &self.inner.store
    }

    #[must_use]
    pub fn is_shutdown_hook_installed(&self) -> bool {
        self.inner.shutdown.is_installed()
    }

    /// Install the signal and panic shutdown hook.
    ///
    /// Only the first call installs anything; returns whether this call did.
    pub fn install_shutdown_hook(&self) -> bool {
        if !self.inner.shutdown.mark_installed() {
            return false;
        }

        let mut panics = chain_panic_hook();
        let mut done = self.inner.shutdown.subscribe();
        let adapter = self.clone();

        tokio::spawn(async move {
            let (trigger, ack) = tokio::select! {
                triggered = wait_for_trigger(&mut panics) => triggered,
                _ = done.wait_for(|complete| *complete) => return,
            };
            let _ = adapter.run_shutdown(trigger).await;
            // Only reached when another shutdown already ran; release the panicking thread
            if let Some(ack) = ack {
                let _ = ack.send(());
            }
        });

        tracing::info!("Shutdown hook installed");
        true
    }

    /// Run the shutdown sequence now
    pub async fn shutdown(&self) -> StoreResult<ReconcileOutcome> {
        self.run_shutdown(ShutdownTrigger::Explicit).await
    }

    /// Resolve once the shutdown sequence has finished
    pub async fn shutdown_complete(&self) {
        self.inner.shutdown.wait().await;
    }

    /// Close the host, reconcile, report. Runs at most once; later callers
    /// wait for the first run and get [`ReconcileOutcome::Skipped`].
    async fn run_shutdown(&self, trigger: ShutdownTrigger) -> StoreResult<ReconcileOutcome> {
        if !self.inner.shutdown.begin() {
            self.inner.shutdown.wait().await;
            return Ok(ReconcileOutcome::Skipped);
        }

        tracing::info!(trigger = ?trigger, "Shutdown started");
        let config = self.config_snapshot();

        if let Some(host) = &config.host {
            host.close_listeners().await;
        }

        let outcome = if config.remove_clients_on_exit {
            Reconciler::new(self.inner.store.as_ref())
                .reconcile(config.enumerator.as_deref())
                .await
        } else {
            Ok(ReconcileOutcome::Skipped)
        };

        match &outcome {
            Ok(result) => tracing::info!(outcome = ?result, "Shutdown reconciliation finished"),
            Err(e) => tracing::error!(error = %e, "Shutdown reconciliation failed"),
        }

        if let Some(callback) = &config.on_shutdown {
            callback(&outcome);
        }
        self.inner.shutdown.finish();

        // A host or callback exits on its own after a signal; a panicking
        // main thread never returns to either
        if let Some(code) = trigger.exit_code() {
            let host_exits = config.on_shutdown.is_some() || config.host.is_some();
            if trigger == ShutdownTrigger::Panic || !host_exits {
                tracing::info!(code, trigger = ?trigger, "Exiting after shutdown");
                std::process::exit(code);
            }
        }

        outcome
    }
}

#[async_trait]
impl RoomAdapter for RoomsAdapter {
    type Update = ConfigUpdate;

    #[instrument(skip(self))]
    async fn add(&self, connection_id: &str, room: &str) -> StoreResult<()> {
        self.inner.store.add(connection_id, room).await
    }

    async fn get(&self, connection_id: Option<&str>) -> StoreResult<Vec<String>> {
        match connection_id {
            Some(id) => self.inner.store.rooms_of(id).await,
            None => self.inner.store.all_rooms().await,
        }
    }

    #[instrument(skip(self))]
    async fn del(&self, connection_id: &str, room: Option<&str>) -> StoreResult<()> {
        match room {
            Some(room) if !room.is_empty() => {
                self.inner
                    .store
                    .remove(connection_id, &[room.to_string()])
                    .await
            }
            _ => {
                // Read then remove: a join landing between the two calls survives
                let rooms = self.inner.store.rooms_of(connection_id).await?;
                self.inner.store.remove(connection_id, &rooms).await
            }
        }
    }

    async fn broadcast(
        &self,
        data: &[Value],
        opts: &BroadcastOptions,
        clients: &dyn LocalConnections,
    ) -> StoreResult<BroadcastReport> {
        let relay = self.inner.config.read().relay;
        BroadcastResolver::new(self.inner.store.as_ref(), relay)
            .run(data, opts, clients)
            .await
    }

    async fn clients(&self, room: &str) -> StoreResult<Vec<String>> {
        self.inner.store.clients(room).await
    }

    #[instrument(skip(self))]
    async fn empty(&self, rooms: RoomList) -> StoreResult<()> {
        if rooms.is_empty() {
            return Ok(());
        }
        self.inner.store.empty_rooms(rooms.as_slice()).await
    }

    async fn is_empty(&self, room: &str) -> StoreResult<bool> {
        Ok(self.inner.store.room_size(room).await? == 0)
    }

    async fn clear(&self) -> StoreResult<u64> {
        self.inner.store.clear().await
    }

    #[instrument(skip(self))]
    async fn config(&self, update: ConfigUpdate) -> StoreResult<()> {
        let current = self.config_snapshot();
        let next = current.merged(update);

        if next.namespace != current.namespace {
            self.inner.store.set_namespace(&next.namespace).await?;
        }

        let install = next.wants_shutdown_hook();
        *self.inner.config.write() = Arc::new(next);

        if install {
            self.install_shutdown_hook();
        }

        tracing::debug!(config = ?self.config_snapshot(), "Adapter reconfigured");
        Ok(())
    }

    fn wildcard(&self) -> &dyn WildcardMatcher {
        self.inner.wildcard.as_ref()
    }
}
