//! Default configuration values
//!
//! Single source of truth for the defaults used by the CLI and by
//! [`ServerOptions::default`](super::ServerOptions).

use std::time::Duration;

/// Environment variable prefix for CLI options
pub const ENV_PREFIX: &str = "TCP_RESPONDER_";

/// Default listen address as string
pub const LISTEN_STR: &str = "0.0.0.0:8000";

/// Default host name put in a generated certificate
pub const DOMAIN_STR: &str = "local.host";

/// Default log level as string
pub const LOG_LEVEL_STR: &str = "info";

/// Reply written before closing when no rule matches
pub const NO_MATCH_REPLY: &str = ":) ";

/// Default per-read deadline in seconds
pub const READ_TIMEOUT_SECS: u64 = 5;

/// Default read buffer size (4KB)
pub const BUFFER_SIZE: usize = 4096;

/// Default per-read deadline
pub fn read_timeout() -> Duration {
    Duration::from_secs(READ_TIMEOUT_SECS)
}

/// Default read buffer size
pub fn buffer_size() -> usize {
    BUFFER_SIZE
}

/// Default listen address
pub fn listen() -> String {
    LISTEN_STR.to_string()
}

/// Default certificate domain
pub fn domain() -> String {
    DOMAIN_STR.to_string()
}
