//! TCP Responder Command Line Tool
//!
//! This binary is the command-line interface for TCP Responder.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};

use tcp_responder::common::{can_listen_on, effective_level, init_logger, random_listen_address};
use tcp_responder::config::defaults;
use tcp_responder::{
    KeyAlgorithm, NoMatchPolicy, Result, Server, ServerOptions, TlsSettings, APP_NAME, VERSION,
};

/// TCP Responder: answer TCP (or TLS) clients from a hot-reloaded list of rules
///
/// Every option can also be set through a `TCP_RESPONDER_*` environment variable.
#[derive(Parser, Debug)]
#[clap(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Listen address (IPv4). A free port is used if it is taken
    #[clap(short, long, default_value = defaults::LISTEN_STR, env = "TCP_RESPONDER_LISTEN")]
    listen: String,

    /// YAML rules file
    #[clap(short, long, env = "TCP_RESPONDER_RULES")]
    rules: PathBuf,

    /// Do not reload the rules file when it changes
    #[clap(long, env = "TCP_RESPONDER_NO_WATCH")]
    no_watch: bool,

    /// Serve TLS instead of plain TCP
    #[clap(long, env = "TCP_RESPONDER_TLS")]
    tls: bool,

    /// Server certificate path (PEM); requires --key
    #[clap(long, env = "TCP_RESPONDER_CERT", requires = "key")]
    cert: Option<PathBuf>,

    /// Server private key path (PEM); requires --cert
    #[clap(long, env = "TCP_RESPONDER_KEY", requires = "cert")]
    key: Option<PathBuf>,

    /// Comma-separated host names and IPs for a generated certificate
    #[clap(long, default_value = defaults::DOMAIN_STR, env = "TCP_RESPONDER_DOMAIN")]
    domain: String,

    /// Key type for a generated certificate (rsa, rsa:BITS, p224, p256, p384, p521, ed25519)
    #[clap(long, default_value = "rsa", env = "TCP_RESPONDER_KEY_TYPE")]
    key_type: KeyAlgorithm,

    /// Seconds to wait for each read before closing the connection
    #[clap(long, default_value_t = defaults::READ_TIMEOUT_SECS, env = "TCP_RESPONDER_READ_TIMEOUT")]
    read_timeout: u64,

    /// Maximum bytes taken by a single read
    #[clap(long, default_value_t = defaults::BUFFER_SIZE, env = "TCP_RESPONDER_BUFFER_SIZE")]
    buffer_size: usize,

    /// Text written before closing when no rule matches
    #[clap(long, default_value = defaults::NO_MATCH_REPLY, env = "TCP_RESPONDER_NO_MATCH_REPLY")]
    no_match_reply: String,

    /// Close silently when no rule matches
    #[clap(long, env = "TCP_RESPONDER_CLOSE_ON_NO_MATCH")]
    close_on_no_match: bool,

    /// Log at debug level
    #[clap(short, long, env = "TCP_RESPONDER_VERBOSE")]
    verbose: bool,

    /// Only log errors
    #[clap(short, long, env = "TCP_RESPONDER_SILENT", conflicts_with = "verbose")]
    silent: bool,

    /// Log level
    #[clap(long, default_value = defaults::LOG_LEVEL_STR, env = "TCP_RESPONDER_LOG_LEVEL")]
    log_level: String,
}

impl Args {
    fn into_options(self, listen: String) -> ServerOptions {
        let tls = self.tls.then(|| TlsSettings {
            cert: self.cert,
            key: self.key,
            domain: self.domain,
            key_algorithm: self.key_type,
        });

        let no_match = if self.close_on_no_match {
            NoMatchPolicy::Close
        } else {
            NoMatchPolicy::Reply(self.no_match_reply.into_bytes())
        };

        ServerOptions {
            listen,
            rules_file: Some(self.rules),
            watch_rules: !self.no_watch,
            tls,
            read_timeout: Duration::from_secs(self.read_timeout),
            buffer_size: self.buffer_size,
            no_match,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logger(effective_level(args.verbose, args.silent, &args.log_level));

    info!("Starting {} v{}", APP_NAME, VERSION);

    if let Err(e) = run(args).await {
        error!("{}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let listen = if can_listen_on(&args.listen) {
        args.listen.clone()
    } else {
        let addr = random_listen_address(&args.listen)?;
        warn!("Cannot listen on {}, using {} instead", args.listen, addr);
        addr.to_string()
    };

    let options = args.into_options(listen);
    info!("No-match policy: {}", options.no_match);

    let server = Server::new(options).bind().await?;
    let handle = server.handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
            let _ = handle.close().await;
        }
    });

    server.run().await
}
