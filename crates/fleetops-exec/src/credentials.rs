//! Login credentials and authentication method selection

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ExecError;

/// Username plus a private key file and/or a password
#[derive(Clone)]
pub struct Credentials {
    /// Remote login name
    pub user: String,
    /// Private key file, takes precedence over the password
    pub key_file: Option<PathBuf>,
    /// Password for password authentication
    pub password: Option<String>,
}

/// Authentication method picked for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod<'a> {
    /// Public key authentication with the given private key file
    Key(&'a Path),
    /// Password authentication
    Password(&'a str),
}

impl AuthMethod<'_> {
    /// Short name used in log lines
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            AuthMethod::Key(_) => "publickey",
            AuthMethod::Password(_) => "password",
        }
    }
}

impl Credentials {
    /// Create credentials with only a username
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            key_file: None,
            password: None,
        }
    }

    /// Set private key path
    #[must_use]
    pub fn with_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_file = Some(path.into());
        self
    }

    /// Set password
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Whether any authentication material is present
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.key_file.is_some() || self.password.is_some()
    }

    /// Pick the authentication method, key file first
    ///
    /// # Errors
    /// Returns `ExecError::NoCredentialsProvided` when neither is set
    pub fn auth_method(&self) -> Result<AuthMethod<'_>, ExecError> {
        if let Some(path) = &self.key_file {
            if self.password.is_some() {
                debug!("both key file and password given, using key file");
            }
            Ok(AuthMethod::Key(path))
        } else if let Some(password) = &self.password {
            Ok(AuthMethod::Password(password))
        } else {
            Err(ExecError::NoCredentialsProvided)
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("key_file", &self.key_file)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Warn when a private key is readable by group or others
///
/// The key is still used; ssh clients that enforce 600 will refuse it.
///
/// # Errors
/// Returns `ExecError::SshKeyError` if the key file cannot be inspected
#[cfg(unix)]
pub fn check_key_permissions(path: &Path) -> Result<(), ExecError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)
        .map_err(|e| ExecError::SshKeyError(format!("{}: {e}", path.display())))?;

    let mode = metadata.permissions().mode();
    if mode & 0o77 != 0 {
        warn!(
            path = %path.display(),
            mode = format!("{:o}", mode & 0o777),
            "key file permissions too open (should be 600)"
        );
    }

    Ok(())
}

/// Warn when a private key is readable by group or others
///
/// # Errors
/// Returns `ExecError::SshKeyError` if the key file cannot be inspected
#[cfg(not(unix))]
pub fn check_key_permissions(path: &Path) -> Result<(), ExecError> {
    std::fs::metadata(path)
        .map(|_| ())
        .map_err(|e| ExecError::SshKeyError(format!("{}: {e}", path.display())))
}
