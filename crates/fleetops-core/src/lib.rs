//! fleetops-core: Fleet orchestration logic
//!
//! Applies one `Action` to an ordered list of hosts, isolating per-host
//! failures, and reports results through the `ReporterActor` (kameo).

pub mod action;
pub mod actor;
pub mod config;
pub mod error;
pub mod executor;
pub mod hosts;
pub mod message;
pub mod orchestrator;
pub mod report;
pub mod result;
pub mod state;

pub use action::{Action, PRIVILEGE_ESCALATION};
pub use actor::reporter::{ReporterActor, ReporterArgs};
pub use config::FleetConfig;
pub use error::CoreError;
pub use hosts::HostSource;
pub use message::{LocalEcho, ReportFleet, ReportHost};
pub use orchestrator::FleetOrchestrator;
pub use report::{LineKind, MemorySink, ReportLine, ReportSink, TracingSink};
pub use result::{FleetOutcome, HostResult, Outcome};
pub use state::{HostState, HostTracker};
