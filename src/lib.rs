//! TCP Responder: a rule based TCP (and TLS) mock server
//!
//! Every chunk of bytes a client sends is matched against an ordered list
//! of rules; the response of the first matching rule is written back on the
//! same connection. Rules come from a YAML file which is watched and
//! reloaded without restarting the listener.
//!
//! # Main Features
//!
//! - Regex and literal substring rules, first match wins
//! - Atomic hot reload; a broken rules file never replaces working rules
//! - Optional TLS with supplied PEM files or an in-memory self-signed certificate
//! - Per-read deadline so idle connections are closed
//!
//! # Example
//!
//! ```no_run
//! use tcp_responder::{Rule, Server, ServerOptions, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let server = Server::new(ServerOptions {
//!         listen: "127.0.0.1:8000".to_string(),
//!         ..ServerOptions::default()
//!     });
//!     server.add_rule(Rule::contains("ping", "pong"));
//!     server.add_rule(Rule::regex(".*", "unknown")?);
//!
//!     let bound = server.bind().await?;
//!     let handle = bound.handle();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         let _ = handle.close().await;
//!     });
//!     bound.run().await
//! }
//! ```

// Public modules
pub mod common;
pub mod config;
pub mod rules;
pub mod server;
pub mod tls;

// Re-export commonly used structures and functions for convenience
pub use common::{ResponderError, Result};
pub use config::{load_rules, ConfigError, NoMatchPolicy, ServerOptions, TlsSettings};
pub use rules::{Rule, RuleSet, RuleStore};
pub use server::{BoundServer, Server, ServerHandle};
pub use tls::{generate_self_signed, CertOptions, KeyAlgorithm};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
