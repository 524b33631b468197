//! `FleetOrchestrator`: applies one action to every host in the list
//!
//! Hosts are independent. Each one walks its own state machine, failures are
//! recorded and never stop the run, and results come back in input order.

use std::future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use kameo::actor::ActorRef;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use fleetops_exec::{Credentials, Endpoint, ExecError, SessionFactory};

use crate::action::Action;
use crate::actor::reporter::ReporterActor;
use crate::config::FleetConfig;
use crate::executor;
use crate::message::{LocalEcho, ReportFleet, ReportHost};
use crate::result::{FleetOutcome, HostResult, Outcome};
use crate::state::{HostState, HostTracker};

/// Drives a fleet run
pub struct FleetOrchestrator {
    /// Opens one session per host
    factory: Arc<dyn SessionFactory>,
    /// Serialized output
    reporter: ActorRef<ReporterActor>,
    /// Run settings
    config: FleetConfig,
    /// Interrupt signal
    cancel: CancellationToken,
}

impl FleetOrchestrator {
    /// Create an orchestrator
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        reporter: ActorRef<ReporterActor>,
        config: FleetConfig,
    ) -> Self {
        Self {
            factory,
            reporter,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the run when cancelled
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Apply `action` to every host, at most `parallel` at a time
    pub async fn run(
        &self,
        hosts: &[String],
        action: &Action,
        credentials: &Credentials,
    ) -> FleetOutcome {
        let workers = self.config.workers();

        info!(
            hosts = hosts.len(),
            action = %action,
            workers,
            transport = self.factory.factory_type(),
            "starting fleet run"
        );

        let results: Vec<HostResult> = stream::iter(hosts.iter().enumerate())
            .map(|(index, token)| self.run_host(index, token, action, credentials))
            .buffered(workers)
            .collect()
            .await;

        let outcome = FleetOutcome::from_results(results);

        let summary = ReportFleet {
            total: outcome.total(),
            succeeded: outcome.succeeded,
            failed: outcome.failed,
        };
        if let Err(e) = self.reporter.ask(summary).await {
            warn!(error = %e, "failed to report fleet summary");
        }

        info!(
            total = outcome.total(),
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "fleet run finished"
        );

        outcome
    }

    /// Process one host and report it
    async fn run_host(
        &self,
        index: usize,
        token: &str,
        action: &Action,
        credentials: &Credentials,
    ) -> HostResult {
        let start = Instant::now();
        let mut tracker = HostTracker::new(token);
        let mut endpoint = None;

        let outcome = if self.cancel.is_cancelled() {
            tracker.fail();
            Outcome::failure(ExecError::Cancelled)
        } else {
            let span = info_span!("host", host = %token);
            let host_timeout = self.config.host_timeout;
            let grace = self.config.cancel_grace;

            let deadline = async {
                match host_timeout {
                    Some(limit) => tokio::time::sleep(limit).await,
                    None => future::pending().await,
                }
            };
            let interrupted = async {
                self.cancel.cancelled().await;
                tokio::time::sleep(grace).await;
            };

            let finished = tokio::select! {
                outcome = self
                    .process_host(&mut tracker, &mut endpoint, token, action, credentials)
                    .instrument(span) => Ok(outcome),
                () = deadline => Err(ExecError::Timeout {
                    timeout: host_timeout.unwrap_or_default(),
                }),
                () = interrupted => Err(ExecError::Cancelled),
            };

            // The dropped future took the session with it
            finished.unwrap_or_else(|e| {
                let state = tracker.fail();
                error!(host = %token, state = %state, error = %e, "host abandoned");
                Outcome::failure(e)
            })
        };

        let result = HostResult {
            index,
            token: token.to_string(),
            endpoint,
            state: tracker.state(),
            outcome,
            duration: start.elapsed(),
            finished_at: Utc::now(),
        };

        if let Err(e) = self
            .reporter
            .tell(ReportHost {
                result: result.clone(),
            })
            .await
        {
            warn!(host = %token, error = %e, "failed to report host");
        }

        result
    }

    /// resolve → connect → execute → close
    async fn process_host(
        &self,
        tracker: &mut HostTracker,
        endpoint_slot: &mut Option<Endpoint>,
        token: &str,
        action: &Action,
        credentials: &Credentials,
    ) -> Outcome {
        let endpoint = match Endpoint::resolve(token) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                error!(error = %e, "cannot resolve host");
                tracker.fail();
                return Outcome::failure(e);
            }
        };
        *endpoint_slot = Some(endpoint.clone());

        advance(tracker, HostState::Connecting);
        info!(endpoint = %endpoint, "connecting to host");

        let mut session = match self.factory.open(&endpoint, credentials).await {
            Ok(session) => session,
            Err(e) => {
                error!(endpoint = %endpoint, error = %e, "connection failed");
                tracker.fail();
                return Outcome::failure(e);
            }
        };
        advance(tracker, HostState::Connected);
        advance(tracker, HostState::Executing);

        if action.is_privileged()
            && let Some(command) = action.command_line()
        {
            let echo = LocalEcho {
                host: token.to_string(),
                command,
            };
            if let Err(e) = self.reporter.tell(echo).await {
                warn!(error = %e, "failed to echo command");
            }
        }

        let outcome = executor::execute(session.as_mut(), action).await;

        if let Err(e) = session.close().await {
            warn!(endpoint = %endpoint, error = %e, "failed to close session");
        }

        if outcome.is_success() {
            advance(tracker, HostState::Succeeded);
        } else {
            tracker.fail();
        }

        outcome
    }
}

fn advance(tracker: &mut HostTracker, next: HostState) {
    if let Err(e) = tracker.transition_to(next) {
        error!(error = %e, "host state machine out of sync");
    }
}
