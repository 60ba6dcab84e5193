//! Configuration module
//!
//! Server options, the rules document loader and the rules file watcher.
//!
//! ```text
//! rules.yaml
//!     → loader.rs (read, parse YAML, compile every rule)
//!     → RuleSet (complete or rejected as a whole)
//!     → RuleStore::replace (atomic swap)
//!
//! on write:
//!     watcher.rs sees the event
//!     → loader.rs builds a fresh RuleSet
//!     → swap on success, keep the old rules on failure
//! ```

pub mod defaults;
mod error;
mod loader;
mod types;
mod watcher;

pub use defaults::ENV_PREFIX;
pub use error::{ConfigError, Result};
pub use loader::{load_rules, load_rules_from_str};
pub use types::{NoMatchPolicy, RuleTemplate, RulesDocument, ServerOptions, TlsSettings};
pub use watcher::{reload, RulesWatcher};
