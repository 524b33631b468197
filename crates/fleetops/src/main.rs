//! fleetops CLI
//!
//! Copy a file to, or run a command on, every host in a list over SSH.
//! Host failures are reported and the run moves on to the next host.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use kameo::actor::Spawn;
use tracing::{error, warn};

use fleetops_core::{
    Action, CoreError, FleetOrchestrator, HostSource, ReporterActor, ReporterArgs, TracingSink,
};
use fleetops_exec::{Credentials, SshSessionFactory};

mod cli;
mod config;
mod logging;

use cli::Cli;
use config::{Config, Settings};

/// Exit code for bad arguments or configuration
const EXIT_CONFIG: u8 = 1;

/// Everything a run needs, validated before any connection is made
#[derive(Debug)]
struct Plan {
    hosts: Vec<String>,
    action: Action,
    credentials: Credentials,
    settings: Settings,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init(cli.debug, cli.simple);

    let config = match Config::load_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return Ok(ExitCode::from(EXIT_CONFIG));
        }
    };

    let plan = match prepare(cli, &config) {
        Ok(plan) => plan,
        Err(e) => {
            error!("{e}");
            return Ok(ExitCode::from(EXIT_CONFIG));
        }
    };

    Ok(execute(plan).await)
}

/// Validate arguments and load the host list
fn prepare(cli: Cli, config: &Config) -> Result<Plan, CoreError> {
    let settings = config.settings(&cli);

    let hosts = HostSource::from_options(cli.host_names, cli.host_file)?.load()?;

    let Some(command) = cli.command else {
        return Err(CoreError::ConfigError("No command given".to_string()));
    };

    let mut credentials = Credentials::new(cli.user_name);
    if let Some(key_file) = cli.key_file {
        if !key_file.is_file() {
            return Err(CoreError::ConfigError(format!(
                "key file does not exist: {}",
                key_file.display()
            )));
        }
        std::fs::File::open(&key_file).map_err(|e| {
            CoreError::ConfigError(format!("cannot read key file {}: {e}", key_file.display()))
        })?;
        credentials = credentials.with_key_file(key_file);
    }
    if let Some(password) = cli.password {
        credentials = credentials.with_password(password);
    }
    if !credentials.is_usable() {
        return Err(CoreError::ConfigError(
            "--password and --key-file are both not specified".to_string(),
        ));
    }

    Ok(Plan {
        hosts,
        action: command.into_action(),
        credentials,
        settings,
    })
}

/// Run the plan against the fleet over SSH
async fn execute(plan: Plan) -> ExitCode {
    let strict = plan.settings.fleet.strict;

    let reporter = ReporterActor::spawn(ReporterArgs {
        sink: Box::new(TracingSink),
    });
    let factory = Arc::new(SshSessionFactory::new(plan.settings.session));
    let orchestrator = FleetOrchestrator::new(factory, reporter.clone(), plan.settings.fleet);

    let token = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, no further hosts will be started");
            token.cancel();
        }
    });

    let outcome = orchestrator
        .run(&plan.hosts, &plan.action, &plan.credentials)
        .await;

    reporter.stop_gracefully().await.ok();

    ExitCode::from(outcome.exit_code(strict))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["fleetops"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_prepare_run() {
        let plan = prepare(
            cli(&["-u", "ops", "-p", "pw", "-n", "a", "-n", "b:2222", "run", "uptime"]),
            &Config::default(),
        )
        .unwrap();

        assert_eq!(plan.hosts, vec!["a", "b:2222"]);
        assert_eq!(plan.action, Action::run("uptime", Vec::<String>::new()));
        assert_eq!(plan.credentials.user, "ops");
        assert!(!plan.settings.fleet.strict);
    }

    #[test]
    fn test_prepare_requires_a_command() {
        let err = prepare(cli(&["-u", "ops", "-p", "pw", "-n", "a"]), &Config::default())
            .unwrap_err();
        assert_eq!(err, CoreError::ConfigError("No command given".to_string()));
    }

    #[test]
    fn test_prepare_requires_credentials() {
        let err = prepare(cli(&["-u", "ops", "-n", "a", "run", "id"]), &Config::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::ConfigError(msg) if msg.contains("--key-file")));
    }

    #[test]
    fn test_prepare_rejects_missing_key_file() {
        let err = prepare(
            cli(&["-u", "ops", "-k", "/nonexistent/id_rsa", "-n", "a", "run", "id"]),
            &Config::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::ConfigError(msg) if msg.contains("key file")));
    }

    #[test]
    fn test_prepare_rejects_both_host_sources() {
        let err = prepare(
            cli(&["-u", "ops", "-p", "pw", "-n", "a", "-f", "hosts.txt", "run", "id"]),
            &Config::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::ConfigError(_)));
    }

    #[test]
    fn test_prepare_rejects_no_hosts() {
        let err = prepare(cli(&["-u", "ops", "-p", "pw", "run", "id"]), &Config::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::ConfigError(_)));
    }

    #[test]
    fn test_prepare_copy_keeps_paths() {
        let plan = prepare(
            cli(&["-u", "ops", "-p", "pw", "-n", "a", "copy", "Cargo.toml", "/tmp/"]),
            &Config::default(),
        )
        .unwrap();
        assert_eq!(
            plan.action,
            Action::copy(PathBuf::from("Cargo.toml"), "/tmp/")
        );
    }
}
