//! Error handling module
//!
//! This module defines the error types and result type aliases used in the application.

use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;

/// TCP responder error type
#[derive(Error, Debug)]
pub enum ResponderError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// OpenSSL error
    #[error("OpenSSL error: {0}")]
    Ssl(#[from] openssl::error::ErrorStack),

    /// Rules configuration error (unreadable file, bad document, bad regex)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A rule pattern added programmatically did not compile
    #[error("Invalid rule pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// No rule matched the received bytes
    #[error("no matched rule")]
    NoMatch,

    /// The peer sent nothing within the read deadline
    #[error("Connection timed out after {0:?}")]
    ConnectionTimeout(Duration),

    /// The listener could not be bound
    #[error("Failed to listen on {addr}: {source}")]
    ListenBind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Self-signed certificate generation failed
    #[error("Certificate generation error: {0}")]
    CertGen(String),

    /// TLS handshake error
    #[error("TLS handshake error: {0}")]
    TlsHandshake(String),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

impl ResponderError {
    /// Build a bind error for the given address
    pub fn bind(addr: impl ToString, source: io::Error) -> Self {
        ResponderError::ListenBind {
            addr: addr.to_string(),
            source,
        }
    }
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `ResponderError`.
pub type Result<T> = std::result::Result<T, ResponderError>;
