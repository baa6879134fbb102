//! Integration test utilities for the room adapter
//!
//! Several adapters sharing one store stand in for several server processes.
//! The in-memory backend is always available; Redis scenarios run when
//! `REDIS_URL` is set.

pub mod fixtures;

pub use fixtures::*;
pub use helpers::*;
