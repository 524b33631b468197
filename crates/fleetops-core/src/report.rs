//! Report lines and the sinks that receive them

use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing::{Level, error, info, warn};

use crate::result::{HostResult, Outcome};

/// Kind of a report line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Line the remote command wrote to stdout
    Stdout,
    /// Line the remote command wrote to stderr
    Stderr,
    /// Host finished successfully
    HostSucceeded,
    /// Host failed
    HostFailed,
    /// Totals for the whole run
    FleetSummary {
        /// No host failed
        clean: bool,
    },
    /// Raw command echoed to the local terminal
    Echo,
}

/// One line of run output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub kind: LineKind,
    /// Originating host, `None` for fleet-wide lines
    pub host: Option<String>,
    pub message: String,
}

impl ReportLine {
    fn for_host(kind: LineKind, host: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            host: Some(host.to_string()),
            message: message.into(),
        }
    }

    /// Log level the line is emitted at
    #[must_use]
    pub fn level(&self) -> Level {
        match self.kind {
            LineKind::Stderr | LineKind::HostFailed => Level::ERROR,
            LineKind::FleetSummary { clean: false } => Level::WARN,
            LineKind::Stdout
            | LineKind::HostSucceeded
            | LineKind::FleetSummary { clean: true }
            | LineKind::Echo => Level::INFO,
        }
    }

    /// Text with the host prefix applied
    #[must_use]
    pub fn render(&self) -> String {
        match &self.host {
            Some(host) => format!("host: {host}: {}", self.message),
            None => self.message.clone(),
        }
    }
}

/// Local echo of a privileged command
#[must_use]
pub fn echo_line(host: &str, command: &str) -> ReportLine {
    ReportLine::for_host(LineKind::Echo, host, command)
}

/// All lines for one finished host: stderr, then stdout, then a summary
#[must_use]
pub fn host_lines(result: &HostResult) -> Vec<ReportLine> {
    let host = result.host();
    let mut lines = Vec::new();

    if let Some(output) = result.outcome.output() {
        lines.extend(
            output
                .stderr
                .iter()
                .map(|l| ReportLine::for_host(LineKind::Stderr, host, l)),
        );
        lines.extend(
            output
                .stdout
                .iter()
                .map(|l| ReportLine::for_host(LineKind::Stdout, host, l)),
        );
    }

    let summary = match &result.outcome {
        Outcome::Success(output) => ReportLine::for_host(
            LineKind::HostSucceeded,
            host,
            format!(
                "succeeded (exit status {}, {:.2?})",
                output.status, result.duration
            ),
        ),
        Outcome::TransferSuccess { bytes_written } => ReportLine::for_host(
            LineKind::HostSucceeded,
            host,
            format!("copied {bytes_written} bytes ({:.2?})", result.duration),
        ),
        Outcome::Failure { error, .. } => ReportLine::for_host(
            LineKind::HostFailed,
            host,
            format!("{}: {error}", result.state),
        ),
    };
    lines.push(summary);

    lines
}

/// Closing line with run totals
#[must_use]
pub fn fleet_line(total: usize, succeeded: usize, failed: usize) -> ReportLine {
    ReportLine {
        kind: LineKind::FleetSummary { clean: failed == 0 },
        host: None,
        message: format!("{total} hosts: {succeeded} succeeded, {failed} failed"),
    }
}

/// Destination for report lines
///
/// Owned by a single reporter actor, so implementations see lines one at a
/// time and never need to lock against each other.
pub trait ReportSink: Send + 'static {
    /// Write one line
    fn emit(&mut self, line: &ReportLine);

    /// Flush buffered output
    fn flush(&mut self) {}
}

/// Sends lines through `tracing`; local echo goes straight to stdout
#[derive(Debug, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn emit(&mut self, line: &ReportLine) {
        if line.kind == LineKind::Echo {
            let mut stdout = std::io::stdout().lock();
            let _ = writeln!(stdout, "{}", line.message);
            return;
        }

        let text = line.render();
        match line.level() {
            Level::ERROR => error!(target: "fleetops::report", "{text}"),
            Level::WARN => warn!(target: "fleetops::report", "{text}"),
            _ => info!(target: "fleetops::report", "{text}"),
        }
    }

    fn flush(&mut self) {
        let _ = std::io::stdout().flush();
    }
}

/// Collects lines in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<ReportLine>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    #[must_use]
    pub fn lines(&self) -> Vec<ReportLine> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl ReportSink for MemorySink {
    fn emit(&mut self, line: &ReportLine) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.clone());
        }
    }
}
