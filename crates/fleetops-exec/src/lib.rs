//! fleetops-exec: Per-host remote execution
//!
//! Resolves host tokens, picks credentials, and opens SSH sessions that can
//! run commands and upload files over SFTP.

pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod result;
mod sftp;
pub mod ssh;
pub mod traits;

pub use credentials::{AuthMethod, Credentials};
pub use endpoint::{DEFAULT_SSH_PORT, Endpoint};
pub use error::{ErrorCategory, ExecError};
pub use result::CommandOutput;
pub use ssh::{HostKeyPolicy, SessionOptions, SshSession, SshSessionFactory};
pub use traits::{ExecOptions, RemoteSession, SessionFactory};
