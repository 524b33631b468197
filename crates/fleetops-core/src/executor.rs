//! Applies an `Action` through an open session

use std::path::Path;

use fleetops_exec::{ExecError, ExecOptions, RemoteSession};
use tracing::{debug, info};

use crate::action::Action;
use crate::result::Outcome;

/// Perform `action` on the host behind `session`
///
/// Never fails outright: every problem is folded into `Outcome::Failure`.
pub async fn execute(session: &mut dyn RemoteSession, action: &Action) -> Outcome {
    match action {
        Action::Copy {
            local_path,
            remote_path,
        } => copy_file(session, local_path, remote_path).await,
        Action::Run { .. } | Action::RunPrivileged { .. } => {
            let cmd = action.command_line().unwrap_or_default();
            run_command(session, &cmd, action.exec_options()).await
        }
    }
}

async fn copy_file(session: &mut dyn RemoteSession, local: &Path, remote_path: &str) -> Outcome {
    if !tokio::fs::metadata(local).await.is_ok_and(|m| m.is_file()) {
        return Outcome::failure(ExecError::LocalFileNotFound(local.display().to_string()));
    }

    info!(local = %local.display(), remote = %remote_path, "copying local file");

    match session.upload(local, remote_path).await {
        Ok(bytes_written) => {
            debug!(bytes = bytes_written, "copy finished");
            Outcome::TransferSuccess { bytes_written }
        }
        Err(e @ (ExecError::LocalFileNotFound(_) | ExecError::RemoteWriteFailed(_))) => {
            Outcome::failure(e)
        }
        Err(e) => Outcome::failure(ExecError::RemoteWriteFailed(e.to_string())),
    }
}

async fn run_command(session: &mut dyn RemoteSession, cmd: &str, opts: ExecOptions) -> Outcome {
    info!(command = %cmd, pty = opts.request_pty, "executing");

    match session.exec(cmd, opts).await {
        Ok(output) if output.success() => Outcome::Success(output),
        Ok(output) => Outcome::Failure {
            error: ExecError::RemoteExecutionError {
                status: output.status,
            },
            output: Some(output),
        },
        Err(e) => Outcome::failure(e),
    }
}
