//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fleetops_core::Action;
use fleetops_exec::HostKeyPolicy;

/// Copy files to and run commands on a fleet of hosts over SSH
#[derive(Parser, Debug)]
#[command(name = "fleetops", version, about, long_about = None)]
pub struct Cli {
    /// Username to use to login to remote hosts
    #[arg(short = 'u', long = "user-name")]
    pub user_name: String,

    /// Private key file for login to remote hosts
    #[arg(short = 'k', long = "key-file")]
    pub key_file: Option<PathBuf>,

    /// Password for login (the key file wins if both are given)
    #[arg(short = 'p', long)]
    pub password: Option<String>,

    /// Host to operate upon, `host` or `host:port` (repeatable)
    #[arg(short = 'n', long = "host-name", help_heading = "Host List")]
    pub host_names: Vec<String>,

    /// File with one host per line
    #[arg(short = 'f', long = "host-file", help_heading = "Host List")]
    pub host_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Log message text only
    #[arg(short, long)]
    pub simple: bool,

    /// Exit non-zero when any host fails
    #[arg(long)]
    pub strict: bool,

    /// Number of hosts processed at once
    #[arg(long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Connect and authentication timeout
    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u64>,

    /// Total time allowed per host, 0 disables
    #[arg(long, value_name = "SECS")]
    pub host_timeout: Option<u64>,

    /// Server host key policy: warn or strict
    #[arg(long, value_name = "POLICY")]
    pub host_key_policy: Option<HostKeyPolicy>,

    /// Configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Copy the specified file to each host in the list
    Copy {
        /// File on this machine
        local_file: PathBuf,
        /// Destination on each host
        remote_path: String,
    },
    /// Execute the command with the specified arguments
    Run {
        /// Program to run
        command_path: String,
        /// Arguments, passed to the remote shell unquoted
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Execute the command through sudo on a pseudo-terminal
    Sudo {
        /// Program to run
        command_path: String,
        /// Arguments, passed to the remote shell unquoted
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

impl Commands {
    /// Action to apply to every host
    #[must_use]
    pub fn into_action(self) -> Action {
        match self {
            Commands::Copy {
                local_file,
                remote_path,
            } => Action::copy(local_file, remote_path),
            Commands::Run { command_path, args } => Action::run(command_path, args),
            Commands::Sudo { command_path, args } => Action::run_privileged(command_path, args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_hyphen_args() {
        let cli = Cli::try_parse_from([
            "fleetops", "-u", "ops", "-k", "id_rsa", "-n", "a", "-n", "b:2222", "run", "ls", "-la",
            "/tmp",
        ])
        .unwrap();

        assert_eq!(cli.user_name, "ops");
        assert_eq!(cli.host_names, vec!["a", "b:2222"]);
        assert_eq!(
            cli.command.unwrap().into_action(),
            Action::run("ls", ["-la", "/tmp"])
        );
    }

    #[test]
    fn test_parse_sudo() {
        let cli = Cli::try_parse_from([
            "fleetops", "-u", "ops", "-p", "pw", "-f", "hosts.txt", "sudo", "reboot",
        ])
        .unwrap();

        assert_eq!(cli.host_file, Some(PathBuf::from("hosts.txt")));
        let action = cli.command.unwrap().into_action();
        assert!(action.is_privileged());
    }

    #[test]
    fn test_parse_copy_and_options() {
        let cli = Cli::try_parse_from([
            "fleetops",
            "-u",
            "ops",
            "-k",
            "key.pem",
            "-n",
            "a",
            "-d",
            "-s",
            "--strict",
            "--parallel",
            "8",
            "--host-key-policy",
            "strict",
            "copy",
            "app.conf",
            "/etc/app/",
        ])
        .unwrap();

        assert!(cli.debug && cli.simple && cli.strict);
        assert_eq!(cli.parallel, Some(8));
        assert_eq!(cli.host_key_policy, Some(HostKeyPolicy::Strict));
        assert_eq!(
            cli.command,
            Some(Commands::Copy {
                local_file: PathBuf::from("app.conf"),
                remote_path: "/etc/app/".to_string(),
            })
        );
    }

    #[test]
    fn test_user_name_required() {
        assert!(Cli::try_parse_from(["fleetops", "-n", "a", "run", "id"]).is_err());
    }

    #[test]
    fn test_command_optional_at_parse_time() {
        let cli = Cli::try_parse_from(["fleetops", "-u", "ops", "-n", "a"]).unwrap();
        assert!(cli.command.is_none());
    }
}
