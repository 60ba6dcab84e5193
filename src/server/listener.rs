//! TCP server module
//!
//! Binds the listener, optionally terminates TLS, and hands every accepted
//! connection to its own [`Session`] task. Rules live in a shared
//! [`RuleStore`] which the file watcher may swap at any time.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use openssl::ssl::{Ssl, SslAcceptor};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_openssl::SslStream;

use super::handler::{Session, SessionSettings};
use super::message::{create_channel, ServerHandle, ServerMessage};
use crate::common::{parse_ipv4_addr, ResponderError, Result};
use crate::config::{self, RulesWatcher, ServerOptions};
use crate::rules::{Rule, RuleStore};
use crate::tls::build_acceptor;

/// Pause after a failed accept, so a persistent error does not spin
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Rule based TCP server
///
/// Holds the options and the rule store until [`bind`](Server::bind) turns
/// it into a listening [`BoundServer`].
///
/// # Example
///
/// ```no_run
/// # use tcp_responder::{Rule, Server, ServerOptions};
/// # async fn run() -> tcp_responder::Result<()> {
/// let server = Server::new(ServerOptions {
///     listen: "127.0.0.1:8000".to_string(),
///     ..ServerOptions::default()
/// });
/// server.add_rule(Rule::contains("ping", "pong"));
/// server.run().await
/// # }
/// ```
pub struct Server {
    options: ServerOptions,
    store: Arc<RuleStore>,
}

impl Server {
    /// Create a server with an empty rule store
    pub fn new(options: ServerOptions) -> Self {
        Self {
            options,
            store: Arc::new(RuleStore::new()),
        }
    }

    /// Shared rule store
    pub fn store(&self) -> Arc<RuleStore> {
        Arc::clone(&self.store)
    }

    /// Append a rule after the current ones
    pub fn add_rule(&self, rule: Rule) {
        self.store.append(rule);
    }

    /// Replace the current rules with the content of `path`
    pub fn load_rules(&self, path: &Path) -> Result<usize> {
        let rules = config::load_rules(path)?;
        Ok(self.store.replace(rules))
    }

    /// Load rules, prepare TLS and bind the listener
    ///
    /// Anything that fails here is fatal: a bad rules file, an unusable
    /// certificate or a busy address.
    pub async fn bind(self) -> Result<BoundServer> {
        let Server { options, store } = self;

        if let Some(path) = &options.rules_file {
            let count = store.replace(config::load_rules(path)?);
            info!("Loaded {} rules from {}", count, path.display());
        }

        let acceptor = match &options.tls {
            Some(tls) => Some(Arc::new(build_acceptor(tls)?)),
            None => None,
        };

        let addr = parse_ipv4_addr(&options.listen)?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ResponderError::bind(addr, e))?;
        let local_addr = listener.local_addr()?;

        let watcher = match &options.rules_file {
            Some(path) if options.watch_rules => {
                let watcher = RulesWatcher::spawn(path, Arc::clone(&store))?;
                info!("Watching rules file {}", watcher.path().display());
                Some(watcher)
            }
            _ => None,
        };

        let (handle, messages) = create_channel();

        Ok(BoundServer {
            listener,
            local_addr,
            acceptor,
            store,
            settings: Arc::new(SessionSettings::from(&options)),
            rules_file: options.rules_file,
            handle,
            messages,
            _watcher: watcher,
        })
    }

    /// Bind and serve until closed
    pub async fn run(self) -> Result<()> {
        self.bind().await?.run().await
    }
}

/// A server with a bound listener, ready to accept
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    acceptor: Option<Arc<SslAcceptor>>,
    store: Arc<RuleStore>,
    settings: Arc<SessionSettings>,
    rules_file: Option<PathBuf>,
    handle: ServerHandle,
    messages: mpsc::Receiver<ServerMessage>,
    // Dropping the watcher stops it
    _watcher: Option<RulesWatcher>,
}

impl BoundServer {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether connections are wrapped in TLS
    pub fn is_tls(&self) -> bool {
        self.acceptor.is_some()
    }

    /// Shared rule store
    pub fn store(&self) -> Arc<RuleStore> {
        Arc::clone(&self.store)
    }

    /// Control handle, valid until [`run`](BoundServer::run) returns
    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    /// Accept connections until a shutdown message arrives
    pub async fn run(self) -> Result<()> {
        let BoundServer {
            listener,
            local_addr,
            acceptor,
            store,
            settings,
            rules_file,
            handle: _handle,
            mut messages,
            _watcher,
        } = self;

        let kind = if acceptor.is_some() { "tls" } else { "tcp" };
        info!("Serving TCP rule based ({}) server on tcp://{}", kind, local_addr);

        let mut tasks = JoinSet::new();

        loop {
            while let Some(result) = tasks.try_join_next() {
                if let Err(e) = result {
                    error!("Connection task failed: {}", e);
                }
            }

            tokio::select! {
                message = messages.recv() => match message {
                    Some(ServerMessage::Reload) => spawn_reload(rules_file.clone(), Arc::clone(&store)),
                    Some(ServerMessage::Shutdown) | None => break,
                },
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!("Accepted connection from {}", peer);
                        let session = Session::new(peer, Arc::clone(&store), Arc::clone(&settings));
                        let acceptor = acceptor.clone();
                        let handshake_timeout = settings.read_timeout;
                        tasks.spawn(async move {
                            serve_connection(stream, session, acceptor, handshake_timeout).await;
                        });
                    }
                    Err(e) => {
                        warn!("Error accepting connection: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        info!("Server on {} closed; {} sessions still open", local_addr, tasks.len());
        tasks.detach_all();
        Ok(())
    }
}

// File IO and regex compilation stay off the accept loop
fn spawn_reload(path: Option<PathBuf>, store: Arc<RuleStore>) {
    let Some(path) = path else {
        warn!("Reload requested but no rules file is configured");
        return;
    };
    tokio::task::spawn_blocking(move || match config::reload(&path, &store) {
        Ok(count) => info!("TCP configuration reloaded. Rules: {}", count),
        Err(e) => error!("Failed to reload rules: {}. Keeping current rules.", e),
    });
}

async fn serve_connection(
    stream: TcpStream,
    session: Session,
    acceptor: Option<Arc<SslAcceptor>>,
    handshake_timeout: Duration,
) {
    let peer = session.peer();
    let end = match acceptor {
        None => session.run(stream).await,
        Some(acceptor) => match tls_accept(stream, &acceptor, handshake_timeout).await {
            Ok(tls_stream) => session.run(tls_stream).await,
            Err(e) => {
                warn!("{}: {}", peer, e);
                return;
            }
        },
    };
    debug!("Connection from {} ended: {}", peer, end);
}

async fn tls_accept(
    stream: TcpStream,
    acceptor: &SslAcceptor,
    handshake_timeout: Duration,
) -> Result<SslStream<TcpStream>> {
    let ssl = Ssl::new(acceptor.context())?;
    let mut tls_stream = SslStream::new(ssl, stream)?;

    match timeout(handshake_timeout, Pin::new(&mut tls_stream).accept()).await {
        Ok(Ok(())) => Ok(tls_stream),
        Ok(Err(e)) => Err(ResponderError::TlsHandshake(e.to_string())),
        Err(_) => Err(ResponderError::TlsHandshake(format!(
            "handshake not finished within {:?}",
            handshake_timeout
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn local_options() -> ServerOptions {
        ServerOptions {
            listen: "127.0.0.1:0".to_string(),
            ..ServerOptions::default()
        }
    }

    #[test]
    fn test_add_rule_appends() {
        let server = Server::new(local_options());
        server.add_rule(Rule::contains("a", "1"));
        server.add_rule(Rule::contains("a", "2"));

        let store = server.store();
        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup(b"a").unwrap().response(), b"1");
    }

    #[test]
    fn test_load_rules_replaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        fs::write(&path, "rules:\n  - match-contains: ping\n    response: pong\n").unwrap();

        let server = Server::new(local_options());
        server.add_rule(Rule::contains("x", "y"));
        assert_eq!(server.load_rules(&path).unwrap(), 1);
        assert!(server.store().lookup(b"x").is_none());
    }

    #[tokio::test]
    async fn test_bind_reports_local_addr() {
        let bound = Server::new(local_options()).bind().await.unwrap();
        assert_eq!(bound.local_addr().ip().to_string(), "127.0.0.1");
        assert_ne!(bound.local_addr().port(), 0);
        assert!(!bound.is_tls());
    }

    #[tokio::test]
    async fn test_bind_busy_address_fails() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let options = ServerOptions {
            listen: taken.local_addr().unwrap().to_string(),
            ..ServerOptions::default()
        };

        match Server::new(options).bind().await {
            Err(ResponderError::ListenBind { .. }) => {}
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("bind should fail on a busy address"),
        }
    }

    #[tokio::test]
    async fn test_bind_rejects_bad_rules_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        fs::write(&path, "rules:\n  - match: \"(\"\n    response: x\n").unwrap();

        let options = ServerOptions {
            rules_file: Some(path),
            ..local_options()
        };
        assert!(matches!(
            Server::new(options).bind().await,
            Err(ResponderError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_close_stops_run() {
        let bound = Server::new(local_options()).bind().await.unwrap();
        let handle = bound.handle();
        let task = tokio::spawn(bound.run());

        handle.close().await.unwrap();
        assert!(task.await.unwrap().is_ok());
    }
}
