//! Adapter configuration.
//!
//! The held configuration is immutable; [`ConfigUpdate`] produces a new value
//! from the current one and replaces it.

use rooms_common::AdapterSettings;
use rooms_core::{ConnectionEnumerator, HostShutdown, StoreResult, DEFAULT_NAMESPACE};
use std::fmt;
use std::sync::Arc;

use crate::lifecycle::ReconcileOutcome;

/// Called once shutdown reconciliation has finished
pub type ShutdownCallback = Arc<dyn Fn(&StoreResult<ReconcileOutcome>) + Send + Sync>;

/// Full adapter configuration
#[derive(Clone)]
pub struct AdapterConfig {
    /// Key namespace
    pub namespace: String,
    /// Hand broadcasts to the cross-process relay instead of writing locally
    pub relay: bool,
    /// Reconcile this process's connections out of the store on shutdown
    pub remove_clients_on_exit: bool,
    /// Lists the connections held by this process
    pub enumerator: Option<Arc<dyn ConnectionEnumerator>>,
    /// Host listener set, closed before reconciliation
    pub host: Option<Arc<dyn HostShutdown>>,
    /// Completion callback for shutdown
    pub on_shutdown: Option<ShutdownCallback>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            relay: false,
            remove_clients_on_exit: false,
            enumerator: None,
            host: None,
            on_shutdown: None,
        }
    }
}

impl fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("namespace", &self.namespace)
            .field("relay", &self.relay)
            .field("remove_clients_on_exit", &self.remove_clients_on_exit)
            .field("enumerator", &self.enumerator.is_some())
            .field("host", &self.host.is_some())
            .field("on_shutdown", &self.on_shutdown.is_some())
            .finish()
    }
}

impl From<&AdapterSettings> for AdapterConfig {
    fn from(settings: &AdapterSettings) -> Self {
        Self {
            namespace: settings.namespace.clone(),
            relay: settings.relay,
            remove_clients_on_exit: settings.remove_clients_on_exit,
            ..Self::default()
        }
    }
}

impl AdapterConfig {
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_relay(mut self, relay: bool) -> Self {
        self.relay = relay;
        self
    }

    #[must_use]
    pub fn with_remove_clients_on_exit(mut self, enabled: bool) -> Self {
        self.remove_clients_on_exit = enabled;
        self
    }

    #[must_use]
    pub fn with_enumerator(mut self, enumerator: Arc<dyn ConnectionEnumerator>) -> Self {
        self.enumerator = Some(enumerator);
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: Arc<dyn HostShutdown>) -> Self {
        self.host = Some(host);
        self
    }

    #[must_use]
    pub fn with_on_shutdown(mut self, callback: ShutdownCallback) -> Self {
        self.on_shutdown = Some(callback);
        self
    }

    /// Whether the shutdown hook should be installed
    #[must_use]
    pub fn wants_shutdown_hook(&self) -> bool {
        self.enumerator.is_some() && self.remove_clients_on_exit
    }

    /// New configuration with the update applied; omitted fields keep their value
    #[must_use]
    pub fn merged(&self, update: ConfigUpdate) -> Self {
        Self {
            namespace: update.namespace.unwrap_or_else(|| self.namespace.clone()),
            relay: update.relay.unwrap_or(self.relay),
            remove_clients_on_exit: update
                .remove_clients_on_exit
                .unwrap_or(self.remove_clients_on_exit),
            enumerator: update.enumerator.or_else(|| self.enumerator.clone()),
            host: update.host.or_else(|| self.host.clone()),
            on_shutdown: update.on_shutdown.or_else(|| self.on_shutdown.clone()),
        }
    }
}

/// Partial configuration; `None` fields are left as they are
#[derive(Clone, Default)]
pub struct ConfigUpdate {
    pub namespace: Option<String>,
    pub relay: Option<bool>,
    pub remove_clients_on_exit: Option<bool>,
    pub enumerator: Option<Arc<dyn ConnectionEnumerator>>,
    pub host: Option<Arc<dyn HostShutdown>>,
    pub on_shutdown: Option<ShutdownCallback>,
}

impl fmt::Debug for ConfigUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigUpdate")
            .field("namespace", &self.namespace)
            .field("relay", &self.relay)
            .field("remove_clients_on_exit", &self.remove_clients_on_exit)
            .field("enumerator", &self.enumerator.is_some())
            .field("host", &self.host.is_some())
            .field("on_shutdown", &self.on_shutdown.is_some())
            .finish()
    }
}

impl ConfigUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn relay(mut self, relay: bool) -> Self {
        self.relay = Some(relay);
        self
    }

    #[must_use]
    pub fn remove_clients_on_exit(mut self, enabled: bool) -> Self {
        self.remove_clients_on_exit = Some(enabled);
        self
    }

    #[must_use]
    pub fn enumerator(mut self, enumerator: Arc<dyn ConnectionEnumerator>) -> Self {
        self.enumerator = Some(enumerator);
        self
    }

    #[must_use]
    pub fn host(mut self, host: Arc<dyn HostShutdown>) -> Self {
        self.host = Some(host);
        self
    }

    #[must_use]
    pub fn on_shutdown(mut self, callback: ShutdownCallback) -> Self {
        self.on_shutdown = Some(callback);
        self
    }
}
