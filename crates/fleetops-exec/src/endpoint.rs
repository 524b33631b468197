//! Host token resolution

use std::fmt;
use std::str::FromStr;

use crate::error::ExecError;

/// Port used when a token carries none
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Resolved SSH target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Hostname or IP address
    pub host: String,
    /// Port (default 22)
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint on the default SSH port
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
        }
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Parse a `host` or `host:port` token
    ///
    /// IPv6 literals are not supported, a bare address splits into too many parts.
    ///
    /// # Errors
    /// Returns `ExecError::MalformedHostToken` for more than one `:`, an empty
    /// host, or a port that is not a positive 16-bit integer
    pub fn resolve(token: &str) -> Result<Self, ExecError> {
        let token = token.trim();
        let malformed = || ExecError::MalformedHostToken(token.to_string());

        let parts: Vec<&str> = token.split(':').collect();
        let (host, port) = match parts.as_slice() {
            [host] => (*host, DEFAULT_SSH_PORT),
            [host, port] => {
                let port: u16 = port.parse().map_err(|_| malformed())?;
                if port == 0 {
                    return Err(malformed());
                }
                (*host, port)
            }
            _ => return Err(malformed()),
        };

        if host.is_empty() {
            return Err(malformed());
        }

        Ok(Self::new(host).with_port(port))
    }
}

impl FromStr for Endpoint {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_uses_default_port() {
        let ep = Endpoint::resolve("10.0.0.2").unwrap();
        assert_eq!(ep.host, "10.0.0.2");
        assert_eq!(ep.port, 22);
    }

    #[test]
    fn test_host_with_port() {
        let ep = Endpoint::resolve("10.0.0.1:2222").unwrap();
        assert_eq!(ep.host, "10.0.0.1");
        assert_eq!(ep.port, 2222);
    }

    #[test]
    fn test_whitespace_trimmed() {
        let ep: Endpoint = "  web-1:2200 \n".parse().unwrap();
        assert_eq!(ep, Endpoint::new("web-1").with_port(2200));
    }

    #[test]
    fn test_malformed_tokens() {
        for token in ["h:p:x", "h:abc", "h:", ":22", "", "h:0", "h:70000", "h:-1"] {
            let err = Endpoint::resolve(token).unwrap_err();
            assert!(
                matches!(err, ExecError::MalformedHostToken(_)),
                "{token:?} should be malformed, got {err:?}"
            );
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Endpoint::new("db").to_string(), "db:22");
    }
}
