//! Common module
//!
//! This module contains shared errors and utility functions used throughout the application.

pub mod error;
pub mod fs;
pub mod log;
pub mod net;

// Re-export commonly used types and functions
pub use error::{ResponderError, Result};
pub use fs::{check_file_exists, read_file};
pub use log::{effective_level, init_logger};
pub use net::{can_listen_on, parse_ipv4_addr, random_listen_address};
