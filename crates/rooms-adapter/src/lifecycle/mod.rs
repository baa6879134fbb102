//! Shutdown reconciliation.
//!
//! Removes this process's connections from the shared store when the process
//! goes away, so dead connection ids don't linger in rooms.

mod reconciler;
mod shutdown;

pub use reconciler::{ReconcileOutcome, Reconciler};
pub use shutdown::ShutdownTrigger;

pub(crate) use shutdown::{chain_panic_hook, wait_for_trigger, ShutdownState};
