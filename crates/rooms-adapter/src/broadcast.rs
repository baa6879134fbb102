//! Broadcast resolution.
//!
//! Turns room names into the cross-process target set, subtracts exclusions,
//! transforms the payload once and hands it to local connections or the relay.

use rooms_core::{BroadcastOptions, BroadcastReport, LocalConnections, MembershipStore, StoreResult};
use serde_json::Value;
use std::collections::HashSet;
use tracing::instrument;

/// Resolves and dispatches one broadcast
pub struct BroadcastResolver<'a> {
    store: &'a dyn MembershipStore,
    relay: bool,
}

impl<'a> BroadcastResolver<'a> {
    #[must_use]
    pub fn new(store: &'a dyn MembershipStore, relay: bool) -> Self {
        Self { store, relay }
    }

    /// Connection ids the broadcast targets, before exclusion.
    ///
    /// With no rooms every connection in the namespace is targeted. A failed
    /// namespace scan is logged and yields no targets; a failed room lookup is
    /// returned to the caller.
    pub async fn targets(&self, rooms: &[String]) -> StoreResult<Vec<String>> {
        if rooms.is_empty() {
            return match self.store.all_connections().await {
                Ok(ids) => Ok(ids),
                Err(e) => {
                    tracing::error!(error = %e, "Full broadcast scan failed, nothing sent");
                    Ok(Vec::new())
                }
            };
        }

        let members = self.store.clients_of_rooms(rooms).await?;
        Ok(union(members))
    }

    /// Resolve, filter, transform and dispatch
    #[instrument(skip_all, fields(rooms = opts.rooms.len(), relay = self.relay))]
    pub async fn run(
        &self,
        data: &[Value],
        opts: &BroadcastOptions,
        clients: &dyn LocalConnections,
    ) -> StoreResult<BroadcastReport> {
        let targets = self.targets(&opts.rooms).await?;
        let targets = exclude(targets, &opts.except);

        let mut report = BroadcastReport {
            targeted: targets.len(),
            ..BroadcastReport::default()
        };
        if targets.is_empty() {
            return Ok(report);
        }

        let payload = opts.transform(data);

        if self.relay {
            // Any local connection can reach the relay; none means nothing to forward from
            let Some(conn) = clients.any() else {
                tracing::debug!("No local connections, relay skipped");
                return Ok(report);
            };
            let Some(relay) = conn.relay() else {
                tracing::warn!(connection_id = %conn.id(), "Connection has no relay handle, broadcast skipped");
                return Ok(report);
            };

            relay.forward(&targets, &payload, opts.method).await?;
            report.relayed = true;
            tracing::debug!(targets = targets.len(), "Broadcast handed to relay");
            return Ok(report);
        }

        for id in &targets {
            let accepted = match clients.get(id) {
                Some(conn) => conn.dispatch(opts.method, &payload).await,
                None => false,
            };
            if accepted {
                report.delivered += 1;
            } else {
                report.dropped += 1;
            }
        }

        tracing::debug!(
            targeted = report.targeted,
            delivered = report.delivered,
            dropped = report.dropped,
            "Broadcast dispatched"
        );
        Ok(report)
    }
}

/// Union of member lists, duplicates collapsed, first-seen order kept
fn union(members: Vec<Vec<String>>) -> Vec<String> {
    let mut seen = HashSet::new();
    members
        .into_iter()
        .flatten()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

fn exclude(targets: Vec<String>, except: &[String]) -> Vec<String> {
    if except.is_empty() {
        return targets;
    }
    let except: HashSet<&str> = except.iter().map(String::as_str).collect();
    targets
        .into_iter()
        .filter(|id| !except.contains(id.as_str()))
        .collect()
}
