//! Host list loading

use std::path::PathBuf;

use tracing::debug;

use crate::error::CoreError;

/// Where the host list comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSource {
    /// Hosts given on the command line
    Names(Vec<String>),
    /// File with one host per line
    File(PathBuf),
}

impl HostSource {
    /// Pick the source from the two mutually exclusive options
    ///
    /// # Errors
    /// Returns `CoreError::ConfigError` if both or neither are given
    pub fn from_options(names: Vec<String>, file: Option<PathBuf>) -> Result<Self, CoreError> {
        match (names.is_empty(), file) {
            (false, Some(_)) => Err(CoreError::ConfigError(
                "only one of --host-name and --host-file can be given".to_string(),
            )),
            (false, None) => Ok(HostSource::Names(names)),
            (true, Some(path)) => Ok(HostSource::File(path)),
            (true, None) => Err(CoreError::ConfigError(
                "specify --host-name OR --host-file".to_string(),
            )),
        }
    }

    /// Load host tokens in input order
    ///
    /// Tokens are trimmed and blank entries dropped. Duplicates are kept.
    ///
    /// # Errors
    /// Returns `CoreError::ConfigError` if the file cannot be read or no hosts remain
    pub fn load(&self) -> Result<Vec<String>, CoreError> {
        let hosts = match self {
            HostSource::Names(names) => clean_tokens(names.iter().map(String::as_str)),
            HostSource::File(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    CoreError::ConfigError(format!("cannot read host file {}: {e}", path.display()))
                })?;
                parse_host_lines(&content)
            }
        };

        if hosts.is_empty() {
            return Err(CoreError::ConfigError("host list is empty".to_string()));
        }

        debug!(?hosts, "hosts loaded");
        Ok(hosts)
    }
}

/// Parse a host file: one token per line
#[must_use]
pub fn parse_host_lines(content: &str) -> Vec<String> {
    clean_tokens(content.lines())
}

fn clean_tokens<'a>(tokens: impl Iterator<Item = &'a str>) -> Vec<String> {
    tokens
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_sources_rejected() {
        let err = HostSource::from_options(
            vec!["web-1".to_string()],
            Some(PathBuf::from("hosts.txt")),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::ConfigError(_)));
    }

    #[test]
    fn test_both_sources_rejected_even_if_empty_names() {
        let err = HostSource::from_options(vec![String::new()], Some(PathBuf::from("x")));
        assert!(err.is_err());
    }

    #[test]
    fn test_neither_source_rejected() {
        let err = HostSource::from_options(vec![], None).unwrap_err();
        assert!(matches!(err, CoreError::ConfigError(_)));
    }

    #[test]
    fn test_names_trimmed_in_order_with_duplicates() {
        let source = HostSource::from_options(
            vec![" b ".to_string(), "a:2222".to_string(), "b".to_string()],
            None,
        )
        .unwrap();
        assert_eq!(source.load().unwrap(), vec!["b", "a:2222", "b"]);
    }

    #[test]
    fn test_parse_host_lines() {
        let content = "10.0.0.1:2222\n  10.0.0.2  \n\n\t\nweb-3\n";
        assert_eq!(
            parse_host_lines(content),
            vec!["10.0.0.1:2222", "10.0.0.2", "web-3"]
        );
    }

    #[test]
    fn test_missing_host_file() {
        let source = HostSource::File(PathBuf::from("/nonexistent/fleetops/hosts.txt"));
        assert!(matches!(source.load(), Err(CoreError::ConfigError(_))));
    }

    #[test]
    fn test_empty_list_rejected() {
        let source = HostSource::Names(vec!["  ".to_string()]);
        assert!(matches!(source.load(), Err(CoreError::ConfigError(_))));
    }
}
