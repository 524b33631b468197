//! Fleet run configuration

use std::time::Duration;

/// Default upper bound on one host's total processing time
pub const DEFAULT_HOST_TIMEOUT: Duration = Duration::from_secs(600);

/// Default time in-flight hosts get to finish after an interrupt
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(5);

/// Settings for one fleet run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetConfig {
    /// Hosts processed at once (1 = strictly sequential)
    pub parallel: usize,
    /// Limit per host from connect to close, `None` to disable
    pub host_timeout: Option<Duration>,
    /// Grace period for in-flight hosts after cancellation
    pub cancel_grace: Duration,
    /// Treat any host failure as a failed run
    pub strict: bool,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            parallel: 1,
            host_timeout: Some(DEFAULT_HOST_TIMEOUT),
            cancel_grace: DEFAULT_CANCEL_GRACE,
            strict: false,
        }
    }
}

impl FleetConfig {
    /// Set the number of hosts processed at once
    #[must_use]
    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel.max(1);
        self
    }

    /// Set the per-host timeout
    #[must_use]
    pub fn with_host_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.host_timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    /// Set the cancellation grace period
    #[must_use]
    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }

    /// Effective worker count
    #[must_use]
    pub fn workers(&self) -> usize {
        self.parallel.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sequential() {
        let config = FleetConfig::default();
        assert_eq!(config.workers(), 1);
        assert!(!config.strict);
        assert_eq!(config.host_timeout, Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_zero_values_are_normalized() {
        let config = FleetConfig::default()
            .with_parallel(0)
            .with_host_timeout(Some(Duration::ZERO));
        assert_eq!(config.workers(), 1);
        assert_eq!(config.host_timeout, None);
    }
}
