//! # rooms-adapter
//!
//! The room adapter: membership operations against the shared store, broadcast
//! resolution across processes, and shutdown reconciliation.
//!
//! ## Example
//!
//! ```ignore
//! use rooms_adapter::{AdapterConfig, RoomsAdapter};
//! use rooms_core::{BroadcastOptions, RoomAdapter};
//!
//! let adapter = RoomsAdapter::new(store, AdapterConfig::default()).await?;
//! adapter.add("spark-1", "lobby").await?;
//! adapter
//!     .broadcast(&[json!("hello")], &BroadcastOptions::to_rooms(["lobby"]), &clients)
//!     .await?;
//! ```

pub mod adapter;
pub mod broadcast;
pub mod config;
pub mod lifecycle;

pub use adapter::RoomsAdapter;
pub use broadcast::BroadcastResolver;
pub use config::{AdapterConfig, ConfigUpdate, ShutdownCallback};
pub use lifecycle::{ReconcileOutcome, Reconciler, ShutdownTrigger};
