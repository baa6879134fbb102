//! Gateway server setup
//!
//! Wires the store, relay and adapter together and serves the WebSocket routes.

mod handler;
mod state;

pub use handler::{gateway_handler, handle_frame};
pub use state::GatewayState;

use crate::connection::ConnectionManager;
use axum::{extract::State, routing::get, Json, Router};
use rooms_adapter::{AdapterConfig, ReconcileOutcome, RoomsAdapter, ShutdownCallback};
use rooms_common::{AppConfig, AppError};
use rooms_core::{LocalConnections, MembershipStore, Relay, StoreError, StoreResult};
use rooms_store::{
    relay_channel, PubSubRelay, RedisMembershipStore, RedisPool, RedisPoolConfig,
    RelayListener, RelayListenerHandle,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/ws", get(gateway_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check(State(state): State<GatewayState>) -> Json<Value> {
    let manager = state.connection_manager();
    Json(json!({
        "status": "ok",
        "connections": manager.connection_count(),
        "accepting": manager.is_accepting(),
    }))
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize all dependencies and create `GatewayState`.
///
/// Also returns the relay listener when relay mode is on; the caller stops it
/// after shutdown.
pub async fn create_gateway_state(
    config: AppConfig,
) -> Result<(GatewayState, Option<RelayListenerHandle>), AppError> {
    // Create Redis pool
    tracing::info!("Connecting to Redis...");
    let redis_config = RedisPoolConfig::from(&config.redis);
    let redis_pool = RedisPool::new(redis_config).map_err(StoreError::from)?;
    redis_pool.health_check().await.map_err(StoreError::from)?;
    let shared_redis = Arc::new(redis_pool);
    tracing::info!("Redis connection established");

    // Membership store, scripts registered up front
    let store = RedisMembershipStore::connect(shared_redis.clone(), &config.adapter.namespace)
        .await?
        .with_scan_count(config.adapter.scan_count);
    let keyspace = store.keyspace();
    let store: Arc<dyn MembershipStore> = Arc::new(store);

    // Create connection manager
    let connection_manager = ConnectionManager::new_shared();

    // Relay publisher and this process's subscriber
    let (relay, relay_listener) = if config.adapter.relay {
        let origin = uuid::Uuid::new_v4().to_string();
        let publisher = PubSubRelay::new(shared_redis.clone(), &keyspace, origin);
        let listener = RelayListener::spawn(
            &config.redis.url,
            &relay_channel(&keyspace),
            connection_manager.clone() as Arc<dyn LocalConnections>,
        )
        .await?;
        (
            Some(Arc::new(publisher) as Arc<dyn Relay>),
            Some(listener),
        )
    } else {
        (None, None)
    };

    let on_shutdown: ShutdownCallback =
        Arc::new(|outcome: &StoreResult<ReconcileOutcome>| match outcome {
            Ok(result) => tracing::info!(outcome = %result.to_json(), "Room membership reconciled"),
            Err(e) => tracing::error!(error = %e, "Room membership left behind in store"),
        });

    let adapter_config = AdapterConfig::from(&config.adapter)
        .with_enumerator(connection_manager.clone())
        .with_host(connection_manager.clone())
        .with_on_shutdown(on_shutdown);
    let adapter = RoomsAdapter::new(store, adapter_config).await?;

    Ok((
        GatewayState::new(adapter, connection_manager, relay, config),
        relay_listener,
    ))
}

/// Run the complete gateway server with configuration.
///
/// Serves until the listeners close, waits for shutdown reconciliation, then
/// drops the remaining connections.
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    // Create gateway state
    let (state, relay_listener) = create_gateway_state(config).await?;
    let addr = state.config().gateway.address();
    let adapter = state.adapter().clone();
    let manager = state.connection_manager().clone();

    // Without the adapter's hook nothing else turns a signal into a shutdown
    if !adapter.is_shutdown_hook_installed() {
        let adapter = adapter.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    let _ = adapter.shutdown().await;
                }
                Err(e) => tracing::error!(error = %e, "Failed to install Ctrl+C handler"),
            }
        });
    }

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;
    tracing::info!("Gateway listening on ws://{}/ws", addr);

    let app = create_app(state);
    let server = {
        let manager = manager.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { manager.closed().await })
                .await
        })
    };

    manager.closed().await;
    adapter.shutdown_complete().await;
    manager.disconnect_all();

    if let Some(listener) = relay_listener {
        listener.stop().await;
    }

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(AppError::Config(format!("Server error: {e}"))),
        Err(e) => return Err(AppError::internal(e)),
    }

    tracing::info!("Gateway stopped");
    Ok(())
}
