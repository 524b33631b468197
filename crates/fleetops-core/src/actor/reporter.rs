//! `ReporterActor`: serialized output for a fleet run
//!
//! Every host's lines go through this one actor, so a host's block is
//! written contiguously even when several hosts finish at once.

use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::ActorStopReason;
use kameo::message::{Context, Message};
use kameo::prelude::*;
use tracing::debug;

use crate::error::CoreError;
use crate::message::{LocalEcho, ReportFleet, ReportHost};
use crate::report::{ReportSink, echo_line, fleet_line, host_lines};

/// Arguments for spawning a `ReporterActor`
pub struct ReporterArgs {
    /// Where lines are written
    pub sink: Box<dyn ReportSink>,
}

/// Single writer for report lines
pub struct ReporterActor {
    /// Output sink
    sink: Box<dyn ReportSink>,
    /// Hosts reported so far
    hosts_reported: usize,
    /// Lines written so far
    lines_emitted: usize,
}

impl Actor for ReporterActor {
    type Args = ReporterArgs;
    type Error = CoreError;

    async fn on_start(args: Self::Args, actor_ref: ActorRef<Self>) -> Result<Self, Self::Error> {
        debug!(id = %actor_ref.id(), "ReporterActor starting");

        Ok(Self {
            sink: args.sink,
            hosts_reported: 0,
            lines_emitted: 0,
        })
    }

    async fn on_stop(
        &mut self,
        _actor_ref: WeakActorRef<Self>,
        reason: ActorStopReason,
    ) -> Result<(), Self::Error> {
        self.sink.flush();
        debug!(
            reason = ?reason,
            hosts = self.hosts_reported,
            lines = self.lines_emitted,
            "ReporterActor stopping"
        );
        Ok(())
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Message<ReportHost> for ReporterActor {
    type Reply = ();

    async fn handle(
        &mut self,
        msg: ReportHost,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        for line in host_lines(&msg.result) {
            self.sink.emit(&line);
            self.lines_emitted += 1;
        }
        self.hosts_reported += 1;
    }
}

impl Message<LocalEcho> for ReporterActor {
    type Reply = ();

    async fn handle(
        &mut self,
        msg: LocalEcho,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.sink.emit(&echo_line(&msg.host, &msg.command));
        self.lines_emitted += 1;
    }
}

impl Message<ReportFleet> for ReporterActor {
    type Reply = ();

    async fn handle(
        &mut self,
        msg: ReportFleet,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.sink
            .emit(&fleet_line(msg.total, msg.succeeded, msg.failed));
        self.lines_emitted += 1;
        self.sink.flush();

        debug!(
            hosts = self.hosts_reported,
            lines = self.lines_emitted,
            "report complete"
        );
    }
}
