//! Store reconciliation for a departing process.

use rooms_core::{ConnectionEnumerator, MembershipStore, StoreResult};
use serde_json::{json, Value};

/// What reconciliation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The enumerated connections were removed (count of ids enumerated)
    Removed(usize),
    /// The whole namespace was cleared (count of keys deleted)
    Cleared(u64),
    /// Nothing was done: reconciliation is disabled or already ran
    Skipped,
}

impl ReconcileOutcome {
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Removed(n) => json!({ "removed": n }),
            Self::Cleared(n) => json!({ "cleared": n }),
            Self::Skipped => json!({ "skipped": true }),
        }
    }
}

/// Removes connection entries from the shared store
pub struct Reconciler<'a> {
    store: &'a dyn MembershipStore,
}

impl<'a> Reconciler<'a> {
    #[must_use]
    pub fn new(store: &'a dyn MembershipStore) -> Self {
        Self { store }
    }

    /// Remove the enumerated connections, or clear the namespace without an enumerator.
    ///
    /// Clearing wipes entries of every process in the namespace, so it is only
    /// correct when the namespace is not shared.
    pub async fn reconcile(
        &self,
        enumerator: Option<&dyn ConnectionEnumerator>,
    ) -> StoreResult<ReconcileOutcome> {
        let Some(enumerator) = enumerator else {
            tracing::warn!("No connection enumerator, clearing the whole namespace");
            let deleted = self.store.clear().await?;
            return Ok(ReconcileOutcome::Cleared(deleted));
        };

        let ids = enumerator.connection_ids();
        if ids.is_empty() {
            tracing::debug!("No local connections to reconcile");
            return Ok(ReconcileOutcome::Removed(0));
        }

        self.store.remove_connections(&ids).await?;
        tracing::info!(count = ids.len(), "Local connections removed from store");
        Ok(ReconcileOutcome::Removed(ids.len()))
    }
}
