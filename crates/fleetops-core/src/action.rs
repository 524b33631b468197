//! Actions applied uniformly across the fleet

use std::fmt;
use std::path::PathBuf;

use fleetops_exec::ExecOptions;

/// Command used to escalate privileges for `RunPrivileged`
pub const PRIVILEGE_ESCALATION: &str = "sudo";

/// The one operation a fleet run performs on every host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Upload a local file
    Copy {
        /// Path on the invoking machine, relative to the working directory
        local_path: PathBuf,
        /// Destination file or directory on the host
        remote_path: String,
    },
    /// Run a command non-interactively
    Run {
        /// Program to run
        command: String,
        /// Arguments, passed through verbatim
        args: Vec<String>,
    },
    /// Run a command through `sudo` on a pseudo-terminal
    RunPrivileged {
        /// Program to run
        command: String,
        /// Arguments, passed through verbatim
        args: Vec<String>,
    },
}

impl Action {
    /// Build a copy action
    pub fn copy(local_path: impl Into<PathBuf>, remote_path: impl Into<String>) -> Self {
        Action::Copy {
            local_path: local_path.into(),
            remote_path: remote_path.into(),
        }
    }

    /// Build a run action
    pub fn run<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Action::Run {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a privileged run action
    pub fn run_privileged<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Action::RunPrivileged {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Subcommand name
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Copy { .. } => "copy",
            Action::Run { .. } => "run",
            Action::RunPrivileged { .. } => "sudo",
        }
    }

    /// Whether the command goes through privilege escalation
    #[must_use]
    pub fn is_privileged(&self) -> bool {
        matches!(self, Action::RunPrivileged { .. })
    }

    /// Remote command line, `None` for copies
    ///
    /// Parts are joined with single spaces and never quoted: the remote shell
    /// parses exactly what was given. Do not feed untrusted arguments.
    #[must_use]
    pub fn command_line(&self) -> Option<String> {
        match self {
            Action::Copy { .. } => None,
            Action::Run { command, args } => Some(join_command(command, args)),
            Action::RunPrivileged { command, args } => Some(format!(
                "{PRIVILEGE_ESCALATION} {}",
                join_command(command, args)
            )),
        }
    }

    /// Channel options for the command
    #[must_use]
    pub fn exec_options(&self) -> ExecOptions {
        if self.is_privileged() {
            ExecOptions::with_pty()
        } else {
            ExecOptions::plain()
        }
    }
}

fn join_command(command: &str, args: &[String]) -> String {
    std::iter::once(command)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Copy {
                local_path,
                remote_path,
            } => write!(f, "copy {} -> {remote_path}", local_path.display()),
            _ => write!(
                f,
                "{} {}",
                self.kind(),
                self.command_line().unwrap_or_default()
            ),
        }
    }
}
