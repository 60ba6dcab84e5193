//! Configuration errors
//!
//! This module defines error types for loading and watching the rules file.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Configuration error type
#[derive(Debug)]
pub enum ConfigError {
    /// Rules file missing or unreadable
    Io { path: PathBuf, source: io::Error },

    /// Rules document is not well formed
    ParseError(String),

    /// A rule carries a regex that does not compile
    RuleCompile {
        index: usize,
        name: Option<String>,
        source: regex::Error,
    },

    /// The file watcher could not be registered
    Watch(String),
}

impl ConfigError {
    /// Build an IO error for `path`
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the rules file itself could not be read
    pub fn is_io(&self) -> bool {
        matches!(self, ConfigError::Io { .. })
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Error reading rules file {}: {}", path.display(), source)
            }

            ConfigError::ParseError(msg) => write!(f, "Error parsing rules: {}", msg),

            ConfigError::RuleCompile { index, name, source } => match name {
                Some(name) => write!(f, "Invalid regex in rule #{} ({}): {}", index, name, source),
                None => write!(f, "Invalid regex in rule #{}: {}", index, source),
            },

            ConfigError::Watch(msg) => write!(f, "Cannot watch rules file: {}", msg),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::RuleCompile { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<notify::Error> for ConfigError {
    fn from(err: notify::Error) -> Self {
        ConfigError::Watch(err.to_string())
    }
}
