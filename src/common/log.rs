//! Logging helpers
//!
//! Thin wrapper around `env_logger`; `RUST_LOG` always wins over the CLI level.

/// Pick the effective log level from the output flags
///
/// `silent` beats `verbose`, and both beat an explicit level.
pub fn effective_level<'a>(verbose: bool, silent: bool, level: &'a str) -> &'a str {
    if silent {
        "error"
    } else if verbose {
        "debug"
    } else {
        level
    }
}

/// Initialize the logging system
///
/// # Parameters
///
/// * `level` - default filter when `RUST_LOG` is not set
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_logger(level: &str) {
    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}
