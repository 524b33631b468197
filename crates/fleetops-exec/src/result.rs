//! Result types for remote command execution

use std::time::Duration;

/// Captured outcome of one remote command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status code (0 for success)
    pub status: i32,
    /// stdout, split into lines in emission order
    pub stdout: Vec<String>,
    /// stderr, split into lines in emission order
    pub stderr: Vec<String>,
    /// Time taken to execute
    pub duration: Duration,
}

impl CommandOutput {
    /// Build from raw channel bytes
    #[must_use]
    pub fn from_raw(status: i32, stdout: &[u8], stderr: &[u8], duration: Duration) -> Self {
        Self {
            status,
            stdout: split_lines(stdout),
            stderr: split_lines(stderr),
            duration,
        }
    }

    /// Check if command succeeded (exit code 0)
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Split captured bytes into lines, tolerating invalid UTF-8 and `\r\n`
fn split_lines(raw: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(raw)
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect()
}
