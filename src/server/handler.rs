//! Connection handler module
//!
//! One [`Session`] per accepted connection. The session alternates between
//! reading a chunk (bounded by a deadline) and writing the response of the
//! first matching rule, until the peer goes away, stays silent, or sends
//! something no rule matches.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::common::ResponderError;
use crate::config::{NoMatchPolicy, ServerOptions};
use crate::rules::RuleStore;

/// Per-connection settings shared by all sessions of a server
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub read_timeout: Duration,
    pub buffer_size: usize,
    pub no_match: NoMatchPolicy,
}

impl From<&ServerOptions> for SessionSettings {
    fn from(options: &ServerOptions) -> Self {
        Self {
            read_timeout: options.read_timeout,
            buffer_size: options.buffer_size.max(1),
            no_match: options.no_match.clone(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&ServerOptions::default())
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer closed its side
    PeerClosed,
    /// Nothing arrived within the read deadline
    Timeout,
    /// The received bytes matched no rule
    NoMatch,
    /// Reading from the socket failed
    ReadError,
    /// Writing the response failed
    WriteError,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionEnd::PeerClosed => "closed by peer",
            SessionEnd::Timeout => "read timeout",
            SessionEnd::NoMatch => "no matched rule",
            SessionEnd::ReadError => "read error",
            SessionEnd::WriteError => "write error",
        };
        f.write_str(text)
    }
}

/// State of one accepted connection
pub struct Session {
    peer: SocketAddr,
    store: Arc<RuleStore>,
    settings: Arc<SessionSettings>,
    buffer: Vec<u8>,
}

impl Session {
    /// Create a session for a connection from `peer`
    pub fn new(peer: SocketAddr, store: Arc<RuleStore>, settings: Arc<SessionSettings>) -> Self {
        let buffer = vec![0u8; settings.buffer_size];
        Self {
            peer,
            store,
            settings,
            buffer,
        }
    }

    /// Remote address of the connection
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Serve the connection until it ends, then shut the stream down
    pub async fn run<S>(mut self, mut stream: S) -> SessionEnd
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let end = self.serve(&mut stream).await;
        let _ = stream.shutdown().await;
        end
    }

    async fn serve<S>(&mut self, stream: &mut S) -> SessionEnd
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let n = match timeout(self.settings.read_timeout, stream.read(&mut self.buffer)).await {
                Err(_) => {
                    debug!(
                        "{}: {}",
                        self.peer,
                        ResponderError::ConnectionTimeout(self.settings.read_timeout)
                    );
                    return SessionEnd::Timeout;
                }
                Ok(Ok(0)) => return SessionEnd::PeerClosed,
                Ok(Ok(n)) => n,
                Ok(Err(e)) => {
                    debug!("{}: read failed: {}", self.peer, e);
                    return SessionEnd::ReadError;
                }
            };

            let input = &self.buffer[..n];
            debug!("{} -> {}", self.peer, String::from_utf8_lossy(input));

            let Some(rule) = self.store.lookup(input) else {
                return self.reject(stream).await;
            };

            info!(
                "Incoming TCP request({}) from: {}",
                rule.display_name(),
                self.peer
            );

            if let Err(e) = write_response(stream, rule.response()).await {
                warn!("{}: write failed: {}", self.peer, e);
                return SessionEnd::WriteError;
            }
            debug!("{} <- {}", self.peer, String::from_utf8_lossy(rule.response()));
        }
    }

    async fn reject<S>(&self, stream: &mut S) -> SessionEnd
    where
        S: AsyncWrite + Unpin,
    {
        info!("Closing connection from {}: {}", self.peer, ResponderError::NoMatch);

        if let NoMatchPolicy::Reply(indicator) = &self.settings.no_match {
            if let Err(e) = write_response(stream, indicator).await {
                debug!("{}: could not send no-match reply: {}", self.peer, e);
            }
        }
        SessionEnd::NoMatch
    }
}

async fn write_response<S>(stream: &mut S, bytes: &[u8]) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(bytes).await?;
    stream.flush().await
}
