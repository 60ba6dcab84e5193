//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tcp_responder::{Server, ServerHandle, ServerOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

pub const PING_RULES: &str = r#"
rules:
  - name: ping
    match-contains: ping
    response: pong
  - match: ".*"
    response: unknown
"#;

/// Options for a server on a random local port
pub fn local_options() -> ServerOptions {
    ServerOptions {
        listen: "127.0.0.1:0".to_string(),
        read_timeout: Duration::from_millis(500),
        ..ServerOptions::default()
    }
}

pub fn write_rules(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("rules.yaml");
    fs::write(&path, content).unwrap();
    path
}

/// A server running in the background
pub struct Running {
    pub addr: SocketAddr,
    pub handle: ServerHandle,
    pub task: JoinHandle<tcp_responder::Result<()>>,
}

impl Running {
    pub async fn stop(self) {
        self.handle.close().await.unwrap();
        self.task.await.unwrap().unwrap();
    }
}

pub async fn start(server: Server) -> Running {
    let bound = server.bind().await.unwrap();
    let addr = bound.local_addr();
    let handle = bound.handle();
    let task = tokio::spawn(bound.run());
    Running { addr, handle, task }
}

/// Write `request` and read a single reply
pub async fn exchange<S>(stream: &mut S, request: &[u8]) -> Vec<u8>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(request).await.unwrap();
    let mut buf = vec![0u8; 4096];
    let n = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf))
        .await
        .expect("no reply in time")
        .unwrap();
    buf.truncate(n);
    buf
}

/// Poll `condition` until it holds or five seconds pass
pub async fn eventually<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
