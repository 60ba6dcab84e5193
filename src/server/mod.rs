//! Server module
//!
//! The accept loop, the per-connection request/response session and the
//! control handle used to stop a running server.

mod handler;
mod message;
mod listener;

pub use handler::{Session, SessionEnd, SessionSettings};
pub use message::{ServerHandle, ServerMessage};
pub use listener::{BoundServer, Server};
