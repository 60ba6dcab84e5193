//! Configuration types
//!
//! Runtime options handed to the server at construction, and the serde
//! model of the rules document.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use super::defaults;
use crate::tls::KeyAlgorithm;

/// What the handler does when no rule matches the received bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoMatchPolicy {
    /// Write the given indicator, then close
    Reply(Vec<u8>),
    /// Close without writing anything
    Close,
}

impl Default for NoMatchPolicy {
    fn default() -> Self {
        NoMatchPolicy::Reply(defaults::NO_MATCH_REPLY.as_bytes().to_vec())
    }
}

impl fmt::Display for NoMatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoMatchPolicy::Reply(bytes) => write!(f, "reply {:?}", String::from_utf8_lossy(bytes)),
            NoMatchPolicy::Close => write!(f, "close"),
        }
    }
}

/// TLS settings for the listener
#[derive(Debug, Clone)]
pub struct TlsSettings {
    /// PEM certificate; used only together with `key`
    pub cert: Option<PathBuf>,
    /// PEM private key; used only together with `cert`
    pub key: Option<PathBuf>,
    /// Comma-separated host names/IPs for a generated certificate
    pub domain: String,
    /// Key type for a generated certificate
    pub key_algorithm: KeyAlgorithm,
}

impl TlsSettings {
    /// Certificate/key pair, if both were supplied
    pub fn identity_files(&self) -> Option<(&PathBuf, &PathBuf)> {
        match (&self.cert, &self.key) {
            (Some(cert), Some(key)) => Some((cert, key)),
            _ => None,
        }
    }
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            cert: None,
            key: None,
            domain: defaults::domain(),
            key_algorithm: KeyAlgorithm::default(),
        }
    }
}

/// Options of the TCP responder
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Listen address (`host:port`, IPv4)
    pub listen: String,
    /// Rules file loaded at startup and watched for changes
    pub rules_file: Option<PathBuf>,
    /// Reload rules when the file is written
    pub watch_rules: bool,
    /// Wrap connections in TLS when set
    pub tls: Option<TlsSettings>,
    /// Deadline for each read
    pub read_timeout: Duration,
    /// Maximum bytes taken by one read
    pub buffer_size: usize,
    /// Behaviour when nothing matches
    pub no_match: NoMatchPolicy,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            listen: defaults::listen(),
            rules_file: None,
            watch_rules: true,
            tls: None,
            read_timeout: defaults::read_timeout(),
            buffer_size: defaults::buffer_size(),
            no_match: NoMatchPolicy::default(),
        }
    }
}

/// Rules document: `rules:` followed by an ordered list of records
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RulesDocument {
    pub rules: Vec<RuleTemplate>,
}

/// One record of the rules document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuleTemplate {
    pub name: Option<String>,
    #[serde(rename = "match")]
    pub pattern: Option<String>,
    #[serde(rename = "match-contains")]
    pub contains: Option<String>,
    pub response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ServerOptions::default();
        assert_eq!(options.listen, "0.0.0.0:8000");
        assert_eq!(options.read_timeout, Duration::from_secs(5));
        assert_eq!(options.buffer_size, 4096);
        assert_eq!(options.no_match, NoMatchPolicy::Reply(b":) ".to_vec()));
        assert!(options.tls.is_none());
    }

    #[test]
    fn test_identity_files_need_both() {
        let mut tls = TlsSettings::default();
        assert!(tls.identity_files().is_none());

        tls.cert = Some("server.crt".into());
        assert!(tls.identity_files().is_none());

        tls.key = Some("server.key".into());
        assert!(tls.identity_files().is_some());
    }
}
