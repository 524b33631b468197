//! Message types for actor communication
//!
//! Message handlers are implemented in their respective actor modules.

use crate::result::HostResult;

// ============================================================================
// ReporterActor Messages
// ============================================================================

/// Report everything captured for one finished host
#[derive(Debug)]
pub struct ReportHost {
    /// Finished host
    pub result: HostResult,
}

/// Echo a privileged command line to the local terminal
#[derive(Debug)]
pub struct LocalEcho {
    /// Host the command is about to run on
    pub host: String,
    /// Command line exactly as sent
    pub command: String,
}

/// Write run totals and flush the sink
#[derive(Debug)]
pub struct ReportFleet {
    /// Hosts processed
    pub total: usize,
    /// Hosts that succeeded
    pub succeeded: usize,
    /// Hosts that failed
    pub failed: usize,
}
