//! SSH sessions using russh crate

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use russh::keys::ssh_key::{self, HashAlg};
use russh::keys::{
    PrivateKeyWithHashAlg, check_known_hosts, check_known_hosts_path, load_secret_key,
};
use russh::{ChannelMsg, Disconnect, client};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use crate::credentials::{AuthMethod, Credentials, check_key_permissions};
use crate::endpoint::Endpoint;
use crate::error::ExecError;
use crate::result::CommandOutput;
use crate::sftp;
use crate::traits::{ExecOptions, RemoteSession, SessionFactory};

/// Default limit for connect plus authentication
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// What to do with server host keys
///
/// `Warn` accepts unknown and changed keys after logging them. `Strict`
/// requires a matching `known_hosts` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostKeyPolicy {
    /// Accept anything, warn on unknown or changed keys
    #[default]
    Warn,
    /// Only accept keys already recorded in `known_hosts`
    Strict,
}

impl FromStr for HostKeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "warn" => Ok(HostKeyPolicy::Warn),
            "strict" => Ok(HostKeyPolicy::Strict),
            other => Err(format!(
                "unknown host key policy {other:?} (expected warn or strict)"
            )),
        }
    }
}

impl fmt::Display for HostKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostKeyPolicy::Warn => f.write_str("warn"),
            HostKeyPolicy::Strict => f.write_str("strict"),
        }
    }
}

/// SSH client handler for russh
#[derive(Debug)]
struct SshClientHandler {
    endpoint: Endpoint,
    policy: HostKeyPolicy,
    /// `None` means `~/.ssh/known_hosts`
    known_hosts: Option<PathBuf>,
}

impl SshClientHandler {
    fn lookup(&self, key: &ssh_key::PublicKey) -> Result<bool, russh::keys::Error> {
        let host = &self.endpoint.host;
        let port = self.endpoint.port;
        match &self.known_hosts {
            Some(path) => check_known_hosts_path(host, port, key, path),
            None => check_known_hosts(host, port, key),
        }
    }
}

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint(HashAlg::Sha256);
        let host = &self.endpoint.host;
        let port = self.endpoint.port;

        match self.lookup(server_public_key) {
            Ok(true) => {
                debug!(host = %host, port, %fingerprint, "host key matches known_hosts");
                Ok(true)
            }
            Ok(false) => match self.policy {
                HostKeyPolicy::Warn => {
                    warn!(host = %host, port, %fingerprint, "unknown host key, accepting");
                    Ok(true)
                }
                HostKeyPolicy::Strict => {
                    error!(host = %host, port, %fingerprint, "unknown host key, rejecting");
                    Ok(false)
                }
            },
            Err(e) => match self.policy {
                HostKeyPolicy::Warn => {
                    warn!(
                        host = %host,
                        port,
                        %fingerprint,
                        error = %e,
                        "host key does not verify against known_hosts, accepting"
                    );
                    Ok(true)
                }
                HostKeyPolicy::Strict => {
                    error!(
                        host = %host,
                        port,
                        %fingerprint,
                        error = %e,
                        "host key does not verify against known_hosts, rejecting"
                    );
                    Ok(false)
                }
            },
        }
    }
}

/// Connection settings shared by every session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Limit for TCP connect, handshake and authentication
    pub connect_timeout: Duration,
    /// Server host key policy
    pub host_key_policy: HostKeyPolicy,
    /// Known hosts file, defaults to `~/.ssh/known_hosts`
    pub known_hosts: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            host_key_policy: HostKeyPolicy::default(),
            known_hosts: None,
        }
    }
}

/// Opens authenticated SSH sessions
#[derive(Debug, Clone, Default)]
pub struct SshSessionFactory {
    options: SessionOptions,
}

impl SshSessionFactory {
    /// Create a factory with the given options
    #[must_use]
    pub fn new(options: SessionOptions) -> Self {
        Self { options }
    }

    /// Get session options
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    async fn connect(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
        method: AuthMethod<'_>,
        key: Option<ssh_key::PrivateKey>,
    ) -> Result<client::Handle<SshClientHandler>, ExecError> {
        info!(
            host = %endpoint.host,
            port = endpoint.port,
            user = %credentials.user,
            auth = method.kind(),
            "connecting to host"
        );

        let config = Arc::new(client::Config::default());
        let handler = SshClientHandler {
            endpoint: endpoint.clone(),
            policy: self.options.host_key_policy,
            known_hosts: self.options.known_hosts.clone(),
        };

        let mut session = client::connect(config, (&endpoint.host[..], endpoint.port), handler)
            .await
            .map_err(|e| map_connect_error(endpoint, e))?;

        let auth_res = match (method, key) {
            (AuthMethod::Key(_), Some(key_pair)) => {
                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .ok()
                    .flatten()
                    .flatten();
                session
                    .authenticate_publickey(
                        &credentials.user,
                        PrivateKeyWithHashAlg::new(Arc::new(key_pair), hash_alg),
                    )
                    .await
                    .map_err(|e| ExecError::AuthenticationFailed(e.to_string()))?
            }
            (AuthMethod::Password(password), _) => session
                .authenticate_password(&credentials.user, password)
                .await
                .map_err(|e| ExecError::AuthenticationFailed(e.to_string()))?,
            (AuthMethod::Key(path), None) => {
                return Err(ExecError::SshKeyError(format!(
                    "{}: key not loaded",
                    path.display()
                )));
            }
        };

        if !auth_res.success() {
            return Err(ExecError::AuthenticationFailed(format!(
                "{} authentication rejected for user {}",
                method.kind(),
                credentials.user
            )));
        }

        info!(host = %endpoint, "SSH connected and authenticated");
        Ok(session)
    }
}

#[async_trait]
impl SessionFactory for SshSessionFactory {
    #[instrument(skip(self, credentials), fields(host = %endpoint))]
    async fn open(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> Result<Box<dyn RemoteSession>, ExecError> {
        let method = credentials.auth_method()?;

        // Key problems are local; surface them before any network I/O
        let key = match method {
            AuthMethod::Key(path) => {
                check_key_permissions(path)?;
                let key_pair =
                    load_secret_key(path, None).map_err(|e| ExecError::SshKeyError(e.to_string()))?;
                Some(key_pair)
            }
            AuthMethod::Password(_) => None,
        };

        let connect_timeout = self.options.connect_timeout;
        let handle = timeout(
            connect_timeout,
            self.connect(endpoint, credentials, method, key),
        )
        .await
        .map_err(|_| {
            error!(host = %endpoint, timeout = ?connect_timeout, "connect timed out");
            ExecError::Timeout {
                timeout: connect_timeout,
            }
        })??;

        Ok(Box::new(SshSession {
            endpoint: endpoint.clone(),
            handle: Some(handle),
        }))
    }

    fn factory_type(&self) -> &'static str {
        "ssh"
    }
}

fn map_connect_error(endpoint: &Endpoint, err: russh::Error) -> ExecError {
    match err {
        russh::Error::IO(ref io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
            ExecError::ConnectionRefused(format!("{endpoint}: {io}"))
        }
        russh::Error::UnknownKey => ExecError::HostKeyRejected(endpoint.to_string()),
        other => ExecError::ConnectionFailed(format!("{endpoint}: {other}")),
    }
}

/// Authenticated SSH session against one endpoint
///
/// Dropping the session without `close` drops the russh handle, which ends
/// the connection.
pub struct SshSession {
    endpoint: Endpoint,
    handle: Option<client::Handle<SshClientHandler>>,
}

impl fmt::Debug for SshSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshSession")
            .field("endpoint", &self.endpoint)
            .field("connected", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}

impl SshSession {
    fn handle(&self) -> Result<&client::Handle<SshClientHandler>, ExecError> {
        self.handle.as_ref().ok_or(ExecError::NotConnected)
    }
}

#[async_trait]
impl RemoteSession for SshSession {
    #[instrument(skip(self, cmd), fields(host = %self.endpoint, pty = opts.request_pty))]
    async fn exec(&mut self, cmd: &str, opts: ExecOptions) -> Result<CommandOutput, ExecError> {
        let session = self.handle()?;

        debug!(command = %cmd, "executing remote command");

        let start = Instant::now();

        let mut channel = session
            .channel_open_session()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        if opts.request_pty {
            channel
                .request_pty(false, "xterm", 80, 24, 0, 0, &[])
                .await
                .map_err(|e| ExecError::IoError(e.to_string()))?;
        }

        channel
            .exec(true, cmd)
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        // Nothing is forwarded on stdin
        channel
            .eof()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let mut status = -1;
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        // Exit status may arrive after EOF, so drain until the channel closes
        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    stdout.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExtendedData { data, ext }) => {
                    if ext == 1 {
                        stderr.extend_from_slice(&data);
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    status = exit_status.cast_signed();
                }
                Some(ChannelMsg::Close) | None => break,
                _ => {}
            }
        }

        let output = CommandOutput::from_raw(status, &stdout, &stderr, start.elapsed());

        debug!(
            command = %cmd,
            status = output.status,
            duration = ?output.duration,
            "remote command completed"
        );

        Ok(output)
    }

    #[instrument(skip(self, local), fields(host = %self.endpoint, local = %local.display()))]
    async fn upload(&mut self, local: &Path, remote_path: &str) -> Result<u64, ExecError> {
        let session = self.handle()?;
        sftp::upload(session, local, remote_path).await
    }

    async fn close(&mut self) -> Result<(), ExecError> {
        if let Some(session) = self.handle.take() {
            session
                .disconnect(Disconnect::ByApplication, "", "English")
                .await
                .map_err(|e| ExecError::IoError(e.to_string()))?;
            info!(host = %self.endpoint, "SSH disconnected");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_key_policy_parse() {
        assert_eq!("warn".parse::<HostKeyPolicy>(), Ok(HostKeyPolicy::Warn));
        assert_eq!("STRICT".parse::<HostKeyPolicy>(), Ok(HostKeyPolicy::Strict));
        assert!("yolo".parse::<HostKeyPolicy>().is_err());
        assert_eq!(HostKeyPolicy::default(), HostKeyPolicy::Warn);
    }

    #[test]
    fn test_default_options() {
        let factory = SshSessionFactory::default();
        assert_eq!(factory.options().connect_timeout, Duration::from_secs(30));
        assert_eq!(factory.factory_type(), "ssh");
    }

    const KNOWN_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIML3wq+WdcSPwbmMMiGXSveo0A7aCeDX+wt7jYisub3/";
    const OTHER_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIHninTybiEadwPOH0AcuHNhG/R57aUh137OOwTomwjXz";

    fn known_hosts_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "fleetops_known_hosts_{name}_{}",
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn handler(endpoint: Endpoint, policy: HostKeyPolicy, known_hosts: &Path) -> SshClientHandler {
        SshClientHandler {
            endpoint,
            policy,
            known_hosts: Some(known_hosts.to_path_buf()),
        }
    }

    fn public_key(openssh: &str) -> ssh_key::PublicKey {
        ssh_key::PublicKey::from_openssh(openssh).unwrap()
    }

    #[tokio::test]
    async fn test_known_key_accepted_under_both_policies() {
        use russh::client::Handler as _;

        let path = known_hosts_file(
            "known",
            &format!("web-1 {KNOWN_KEY}\n[web-2]:2222 {KNOWN_KEY}\n"),
        );
        let key = public_key(KNOWN_KEY);

        for policy in [HostKeyPolicy::Warn, HostKeyPolicy::Strict] {
            let mut h = handler(Endpoint::new("web-1"), policy, &path);
            assert!(h.check_server_key(&key).await.unwrap());

            let mut h = handler(Endpoint::new("web-2").with_port(2222), policy, &path);
            assert!(h.check_server_key(&key).await.unwrap());
        }

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_unknown_key_depends_on_policy() {
        use russh::client::Handler as _;

        let path = known_hosts_file("unknown", &format!("web-1 {KNOWN_KEY}\n"));
        let key = public_key(OTHER_KEY);

        let mut strict = handler(Endpoint::new("db-1"), HostKeyPolicy::Strict, &path);
        assert!(!strict.check_server_key(&key).await.unwrap());

        let mut warn = handler(Endpoint::new("db-1"), HostKeyPolicy::Warn, &path);
        assert!(warn.check_server_key(&key).await.unwrap());

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_changed_key_depends_on_policy() {
        use russh::client::Handler as _;

        let path = known_hosts_file("changed", &format!("web-1 {KNOWN_KEY}\n"));
        let key = public_key(OTHER_KEY);

        let mut strict = handler(Endpoint::new("web-1"), HostKeyPolicy::Strict, &path);
        assert!(!strict.check_server_key(&key).await.unwrap());

        let mut warn = handler(Endpoint::new("web-1"), HostKeyPolicy::Warn, &path);
        assert!(warn.check_server_key(&key).await.unwrap());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_refused_connection_is_classified() {
        let endpoint = Endpoint::new("10.0.0.9");
        let io = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
        let err = map_connect_error(&endpoint, russh::Error::IO(io));
        assert!(matches!(err, ExecError::ConnectionRefused(_)));
    }

    #[tokio::test]
    async fn test_open_without_credentials_fails_before_connecting() {
        // Port 9 on a documentation address; would hang if a connect were tried
        let endpoint = Endpoint::new("192.0.2.1").with_port(9);
        let factory = SshSessionFactory::new(SessionOptions {
            connect_timeout: Duration::from_secs(60),
            host_key_policy: HostKeyPolicy::Strict,
            known_hosts: None,
        });

        let result = factory.open(&endpoint, &Credentials::new("ops")).await;
        assert!(matches!(result, Err(ExecError::NoCredentialsProvided)));
    }

    #[tokio::test]
    async fn test_open_with_missing_key_fails_locally() {
        let endpoint = Endpoint::new("192.0.2.1");
        let creds = Credentials::new("ops").with_key_file("/nonexistent/fleetops/id_ed25519");

        let result = SshSessionFactory::default().open(&endpoint, &creds).await;
        assert!(matches!(result, Err(ExecError::SshKeyError(_))));
    }

    // These tests require an SSH server - marked as ignored
    #[tokio::test]
    #[ignore = "requires SSH server"]
    async fn test_ssh_run_uptime() {
        let creds = Credentials::new(std::env::var("USER").unwrap_or_default())
            .with_key_file(format!("{}/.ssh/id_ed25519", std::env::var("HOME").unwrap()));
        let mut session = SshSessionFactory::default()
            .open(&Endpoint::new("localhost"), &creds)
            .await
            .unwrap();

        let out = session.exec("uptime", ExecOptions::plain()).await.unwrap();
        assert!(out.success());
        session.close().await.unwrap();
    }
}
