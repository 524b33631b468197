//! Per-host and fleet-wide results

use std::time::Duration;

use chrono::{DateTime, Utc};
use fleetops_exec::{CommandOutput, Endpoint, ExecError};

use crate::state::HostState;

/// What happened on one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Command exited with status 0
    Success(CommandOutput),
    /// File was uploaded
    TransferSuccess {
        /// Bytes streamed to the host
        bytes_written: u64,
    },
    /// Anything else
    Failure {
        /// Why the host failed
        error: ExecError,
        /// Output captured before the failure, if a command ran
        output: Option<CommandOutput>,
    },
}

impl Outcome {
    /// Failure without captured output
    #[must_use]
    pub fn failure(error: ExecError) -> Self {
        Outcome::Failure {
            error,
            output: None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failure { .. })
    }

    /// Captured command output, if any
    #[must_use]
    pub fn output(&self) -> Option<&CommandOutput> {
        match self {
            Outcome::Success(output) => Some(output),
            Outcome::Failure { output, .. } => output.as_ref(),
            Outcome::TransferSuccess { .. } => None,
        }
    }

    /// Failure reason, if any
    #[must_use]
    pub fn error(&self) -> Option<&ExecError> {
        match self {
            Outcome::Failure { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Result of processing one entry of the host list
#[derive(Debug, Clone)]
pub struct HostResult {
    /// Position in the input host list
    pub index: usize,
    /// Host token as given
    pub token: String,
    /// Resolved endpoint, `None` if the token was malformed
    pub endpoint: Option<Endpoint>,
    /// Terminal state reached
    pub state: HostState,
    /// Outcome of the action
    pub outcome: Outcome,
    /// Wall time spent on this host
    pub duration: Duration,
    /// When processing finished
    pub finished_at: DateTime<Utc>,
}

impl HostResult {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.state == HostState::Succeeded && self.outcome.is_success()
    }

    /// Name used when reporting this host
    #[must_use]
    pub fn host(&self) -> &str {
        &self.token
    }
}

/// Aggregate over all hosts of one run
#[derive(Debug, Clone)]
pub struct FleetOutcome {
    /// Results in input order
    pub results: Vec<HostResult>,
    /// Hosts that succeeded
    pub succeeded: usize,
    /// Hosts that failed
    pub failed: usize,
}

impl FleetOutcome {
    /// Aggregate per-host results
    #[must_use]
    pub fn from_results(results: Vec<HostResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.succeeded()).count();
        let failed = results.len() - succeeded;
        Self {
            results,
            succeeded,
            failed,
        }
    }

    /// Number of hosts processed
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// No host failed
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Process exit code for this outcome
    ///
    /// Host failures only count when `strict` is set.
    #[must_use]
    pub fn exit_code(&self, strict: bool) -> u8 {
        if strict && !self.is_clean() { 2 } else { 0 }
    }
}
