//! Core error types for fleetops-core

use thiserror::Error;

use crate::state::HostState;

/// Errors that abort or corrupt a fleet run
///
/// Per-host failures are not errors at this level; they are recorded in
/// `HostResult` as `ExecError`s.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Configuration error, the run never starts
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Invalid state transition attempted
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: HostState,
        /// Attempted target state
        to: HostState,
    },
}
