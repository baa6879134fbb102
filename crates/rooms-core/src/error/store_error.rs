//! Store errors - failures surfaced by membership store implementations

use thiserror::Error;

/// Errors produced while talking to the shared membership store
#[derive(Debug, Error)]
pub enum StoreError {
    // =========================================================================
    // Transport Errors
    // =========================================================================
    #[error("Store command failed: {0}")]
    Transport(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Atomic script failed: {0}")]
    Script(String),

    // =========================================================================
    // Setup Errors
    // =========================================================================
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    #[error("Store misconfigured: {0}")]
    Misconfigured(String),

    // =========================================================================
    // Relay Errors
    // =========================================================================
    #[error("Relay forward failed: {0}")]
    Relay(String),
}

impl StoreError {
    /// Get an error code string for client-facing responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "STORE_TRANSPORT",
            Self::Unavailable(_) => "STORE_UNAVAILABLE",
            Self::Script(_) => "STORE_SCRIPT",
            Self::InvalidNamespace(_) => "INVALID_NAMESPACE",
            Self::Misconfigured(_) => "STORE_MISCONFIGURED",
            Self::Relay(_) => "RELAY_FAILED",
        }
    }

    /// Check if this error came from the store connection rather than from setup
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Unavailable(_) | Self::Script(_)
        )
    }

    /// Check if this error is a fatal setup problem
    pub fn is_misconfiguration(&self) -> bool {
        matches!(self, Self::InvalidNamespace(_) | Self::Misconfigured(_))
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
