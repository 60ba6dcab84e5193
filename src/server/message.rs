//! Server control messages
//!
//! A running server owns its listener and is steered from the outside
//! through a [`ServerHandle`], which only holds the sending half of a
//! channel. The accept loop picks messages up between connections.

use tokio::sync::mpsc;

use crate::common::{ResponderError, Result};

/// Messages understood by a running server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMessage {
    /// Re-read the rules file now
    Reload,
    /// Stop accepting connections; open sessions finish on their own
    Shutdown,
}

/// Control handle of a running server
///
/// Cheap to clone. Sending fails once the server has stopped.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    sender: mpsc::Sender<ServerMessage>,
}

impl ServerHandle {
    pub(crate) fn new(sender: mpsc::Sender<ServerMessage>) -> Self {
        Self { sender }
    }

    /// Send a message to the server
    pub async fn send(&self, message: ServerMessage) -> Result<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| ResponderError::Other("Server is no longer running".to_string()))
    }

    /// Ask the server to reload its rules file
    pub async fn reload(&self) -> Result<()> {
        self.send(ServerMessage::Reload).await
    }

    /// Stop the server
    pub async fn close(&self) -> Result<()> {
        self.send(ServerMessage::Shutdown).await
    }

    /// Whether the server has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Create a control channel
pub(crate) fn create_channel() -> (ServerHandle, mpsc::Receiver<ServerMessage>) {
    let (tx, rx) = mpsc::channel(16);
    (ServerHandle::new(tx), rx)
}
