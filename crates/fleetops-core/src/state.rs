//! Per-host state machine

use std::fmt;

use tracing::debug;

use crate::error::CoreError;

/// Lifecycle of one host within a fleet run
///
/// `Pending → Connecting → Connected → Executing → Succeeded | ExecutionFailed`,
/// with `ConnectionFailed` reachable before a session exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostState {
    Pending,
    Connecting,
    Connected,
    Executing,
    Succeeded,
    ExecutionFailed,
    ConnectionFailed,
}

impl HostState {
    /// Whether `next` is a legal successor of `self`
    #[must_use]
    pub fn can_transition_to(self, next: HostState) -> bool {
        use HostState::{
            Connected, Connecting, ConnectionFailed, Executing, ExecutionFailed, Pending,
            Succeeded,
        };

        matches!(
            (self, next),
            (Pending, Connecting | ConnectionFailed)
                | (Connecting, Connected | ConnectionFailed)
                | (Connected, Executing | ExecutionFailed)
                | (Executing, Succeeded | ExecutionFailed)
        )
    }

    /// No further transitions possible
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            HostState::Succeeded | HostState::ExecutionFailed | HostState::ConnectionFailed
        )
    }

    /// A session was never established in this state
    #[must_use]
    pub fn before_session(self) -> bool {
        matches!(self, HostState::Pending | HostState::Connecting)
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HostState::Pending => "pending",
            HostState::Connecting => "connecting",
            HostState::Connected => "connected",
            HostState::Executing => "executing",
            HostState::Succeeded => "succeeded",
            HostState::ExecutionFailed => "execution_failed",
            HostState::ConnectionFailed => "connection_failed",
        };
        f.write_str(s)
    }
}

/// Tracks one host through the state machine
#[derive(Debug, Clone)]
pub struct HostTracker {
    host: String,
    state: HostState,
}

impl HostTracker {
    /// Start tracking a host in `Pending`
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            state: HostState::Pending,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> HostState {
        self.state
    }

    /// Transition to a new state with validation
    ///
    /// # Errors
    /// Returns `CoreError::InvalidTransition` if `next` is not reachable
    pub fn transition_to(&mut self, next: HostState) -> Result<(), CoreError> {
        if !self.state.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        debug!(host = %self.host, from = %self.state, to = %next, "state transition");
        self.state = next;
        Ok(())
    }

    /// Move to the failure state matching how far the host got
    ///
    /// Terminal states are left untouched.
    pub fn fail(&mut self) -> HostState {
        if !self.state.is_terminal() {
            let next = if self.state.before_session() {
                HostState::ConnectionFailed
            } else {
                HostState::ExecutionFailed
            };
            debug!(host = %self.host, from = %self.state, to = %next, "state transition");
            self.state = next;
        }
        self.state
    }
}
