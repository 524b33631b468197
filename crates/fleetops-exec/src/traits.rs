//! Session traits

use std::path::Path;

use async_trait::async_trait;

use crate::credentials::Credentials;
use crate::endpoint::Endpoint;
use crate::error::ExecError;
use crate::result::CommandOutput;

/// How a command is run on the remote side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecOptions {
    /// Request a pseudo-terminal before running the command
    pub request_pty: bool,
}

impl ExecOptions {
    /// Plain non-interactive execution
    #[must_use]
    pub fn plain() -> Self {
        Self { request_pty: false }
    }

    /// Execution with a pseudo-terminal allocated
    #[must_use]
    pub fn with_pty() -> Self {
        Self { request_pty: true }
    }
}

/// One authenticated connection to a single host
#[async_trait]
pub trait RemoteSession: Send {
    /// Run a command line, closing stdin immediately
    async fn exec(&mut self, cmd: &str, opts: ExecOptions) -> Result<CommandOutput, ExecError>;

    /// Stream a local file to `remote_path`, returning bytes written
    async fn upload(&mut self, local: &Path, remote_path: &str) -> Result<u64, ExecError>;

    /// Tear the connection down
    async fn close(&mut self) -> Result<(), ExecError>;
}

/// Opens sessions against endpoints
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Connect and authenticate
    async fn open(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> Result<Box<dyn RemoteSession>, ExecError>;

    /// Short name of the transport
    fn factory_type(&self) -> &'static str;
}
