//! Configuration loading and types
//!
//! A TOML file supplies defaults; command-line flags override them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fleetops_core::FleetConfig;
use fleetops_exec::{HostKeyPolicy, SessionOptions};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// Environment variable naming a configuration file
pub const CONFIG_ENV: &str = "FLEETOPS_CONFIG";

/// Top-level configuration for fleetops
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Run defaults
    #[serde(default)]
    pub defaults: Defaults,
}

/// Defaults applied when the matching flag is absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Hosts processed at once
    pub parallel: usize,
    /// Connect and authentication timeout in seconds
    pub connect_timeout_secs: u64,
    /// Per-host timeout in seconds, 0 disables
    pub host_timeout_secs: u64,
    /// Seconds in-flight hosts get after an interrupt
    pub cancel_grace_secs: u64,
    /// Exit non-zero when any host fails
    pub strict: bool,
    /// Server host key policy
    pub host_key_policy: HostKeyPolicy,
    /// Known hosts file, `~/.ssh/known_hosts` when unset
    pub known_hosts: Option<PathBuf>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            parallel: 1,
            connect_timeout_secs: 30,
            host_timeout_secs: 600,
            cancel_grace_secs: 5,
            strict: false,
            host_key_policy: HostKeyPolicy::Warn,
            known_hosts: None,
        }
    }
}

/// Effective settings after merging file and flags
#[derive(Debug, Clone)]
pub struct Settings {
    pub fleet: FleetConfig,
    pub session: SessionOptions,
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("cannot read config {}: {e}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("invalid config {}: {e}", path.display()))?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Load from an explicit path, `$FLEETOPS_CONFIG`, or the default paths
    ///
    /// An explicit or environment path must exist. Otherwise a missing file
    /// means built-in defaults.
    ///
    /// # Errors
    /// Returns error if the chosen file cannot be read or parsed
    pub fn load_default(explicit: Option<&Path>) -> eyre::Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load(&PathBuf::from(path));
        }

        let paths = [
            Some(PathBuf::from("fleetops.toml")),
            dirs::config_dir().map(|p| p.join("fleetops/fleetops.toml")),
        ];

        for path in paths.into_iter().flatten() {
            if path.exists() {
                return Self::load(&path);
            }
        }

        tracing::debug!("no config file found, using defaults");
        Ok(Config::default())
    }

    /// Merge with command-line flags, flags winning
    #[must_use]
    pub fn settings(&self, cli: &Cli) -> Settings {
        let d = &self.defaults;

        let host_timeout = cli.host_timeout.unwrap_or(d.host_timeout_secs);
        let fleet = FleetConfig {
            strict: cli.strict || d.strict,
            ..FleetConfig::default()
        }
        .with_parallel(cli.parallel.unwrap_or(d.parallel))
        .with_host_timeout(Some(Duration::from_secs(host_timeout)))
        .with_cancel_grace(Duration::from_secs(d.cancel_grace_secs));

        let session = SessionOptions {
            connect_timeout: Duration::from_secs(
                cli.connect_timeout.unwrap_or(d.connect_timeout_secs),
            ),
            host_key_policy: cli.host_key_policy.unwrap_or(d.host_key_policy),
            known_hosts: d.known_hosts.clone(),
        };

        Settings { fleet, session }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["fleetops", "-u", "ops", "-n", "a"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["run", "id"]);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());

        let settings = config.settings(&cli(&[]));
        assert_eq!(settings.fleet.workers(), 1);
        assert_eq!(settings.fleet.host_timeout, Some(Duration::from_secs(600)));
        assert_eq!(settings.session.connect_timeout, Duration::from_secs(30));
        assert_eq!(settings.session.host_key_policy, HostKeyPolicy::Warn);
    }

    #[test]
    fn test_partial_defaults_section() {
        let config: Config = toml::from_str(
            r#"
            [defaults]
            parallel = 4
            host_key_policy = "strict"
            known_hosts = "/etc/fleetops/known_hosts"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.settings(&cli(&[])).session.known_hosts,
            Some(PathBuf::from("/etc/fleetops/known_hosts"))
        );
        assert_eq!(config.defaults.parallel, 4);
        assert_eq!(config.defaults.host_key_policy, HostKeyPolicy::Strict);
        assert_eq!(config.defaults.cancel_grace_secs, 5);
    }

    #[test]
    fn test_flags_override_file() {
        let config: Config = toml::from_str(
            r"
            [defaults]
            parallel = 4
            connect_timeout_secs = 10
            host_timeout_secs = 0
            ",
        )
        .unwrap();

        let settings = config.settings(&cli(&["--parallel", "2", "--strict"]));
        assert_eq!(settings.fleet.parallel, 2);
        assert!(settings.fleet.strict);
        assert_eq!(settings.fleet.host_timeout, None);
        assert_eq!(settings.session.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let parsed: Result<Config, _> = toml::from_str(
            r#"
            [defaults]
            host_key_policy = "trust-me"
            "#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let result = Config::load_default(Some(Path::new("/nonexistent/fleetops.toml")));
        assert!(result.is_err());
    }
}
