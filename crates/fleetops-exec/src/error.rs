//! Error types for fleetops-exec

use std::time::Duration;

use thiserror::Error;

/// Broad classification of a per-host failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Could not reach or authenticate against the host
    Connection,
    /// The remote command failed or the channel broke
    Execution,
    /// File upload failed
    Transfer,
    /// Run was interrupted before the host finished
    Cancelled,
}

/// Errors that can occur while working against a single host
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// Host token could not be parsed as `host` or `host:port`
    #[error("malformed host token: {0:?}")]
    MalformedHostToken(String),

    /// Neither a key file nor a password was supplied
    #[error("no credentials provided: need --key-file or --password")]
    NoCredentialsProvided,

    /// Remote end refused the TCP connection
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// Failed to connect to remote host
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Server host key was rejected by the host key policy
    #[error("host key rejected: {0}")]
    HostKeyRejected(String),

    /// SSH key could not be loaded
    #[error("SSH key error: {0}")]
    SshKeyError(String),

    /// Operation timed out
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// Remote command exited with a non-zero status
    #[error("remote command exited with status {status}")]
    RemoteExecutionError {
        /// Exit status code
        status: i32,
    },

    /// Local file to upload does not exist
    #[error("local file not found: {0}")]
    LocalFileNotFound(String),

    /// Upload to the remote path failed
    #[error("remote write failed: {0}")]
    RemoteWriteFailed(String),

    /// I/O error on the session channel
    #[error("I/O error: {0}")]
    IoError(String),

    /// Session was already closed
    #[error("not connected")]
    NotConnected,

    /// Host was abandoned because the run was interrupted
    #[error("cancelled")]
    Cancelled,
}

impl ExecError {
    /// Classify the error for reporting
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExecError::MalformedHostToken(_)
            | ExecError::NoCredentialsProvided
            | ExecError::ConnectionRefused(_)
            | ExecError::ConnectionFailed(_)
            | ExecError::AuthenticationFailed(_)
            | ExecError::HostKeyRejected(_)
            | ExecError::SshKeyError(_)
            | ExecError::Timeout { .. } => ErrorCategory::Connection,
            ExecError::RemoteExecutionError { .. }
            | ExecError::IoError(_)
            | ExecError::NotConnected => ErrorCategory::Execution,
            ExecError::LocalFileNotFound(_) | ExecError::RemoteWriteFailed(_) => {
                ErrorCategory::Transfer
            }
            ExecError::Cancelled => ErrorCategory::Cancelled,
        }
    }
}
