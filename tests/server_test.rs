//! End-to-end tests over plain TCP

mod common;

use std::time::{Duration, Instant};

use common::{exchange, local_options, start, write_rules, PING_RULES};
use tcp_responder::{NoMatchPolicy, Rule, Server, ServerOptions};
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[tokio::test]
async fn test_ping_pong_and_fallback() {
    let dir = tempdir().unwrap();
    let options = ServerOptions {
        rules_file: Some(write_rules(dir.path(), PING_RULES)),
        ..local_options()
    };
    let running = start(Server::new(options)).await;

    let mut stream = TcpStream::connect(running.addr).await.unwrap();
    assert_eq!(exchange(&mut stream, b"ping").await, b"pong");
    assert_eq!(exchange(&mut stream, b"xyz").await, b"unknown");
    assert_eq!(exchange(&mut stream, b"say ping please").await, b"pong");

    running.stop().await;
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    let dir = tempdir().unwrap();
    let options = ServerOptions {
        rules_file: Some(write_rules(dir.path(), PING_RULES)),
        read_timeout: Duration::from_millis(600),
        ..local_options()
    };
    let running = start(Server::new(options)).await;

    let mut active = TcpStream::connect(running.addr).await.unwrap();
    assert_eq!(exchange(&mut active, b"ping").await, b"pong");

    let mut idle = TcpStream::connect(running.addr).await.unwrap();
    let started = Instant::now();

    // Keep the active client talking well inside its own deadline while the
    // idle one runs out of time
    let idle_closed = tokio::spawn(async move {
        let mut rest = Vec::new();
        tokio::time::timeout(Duration::from_secs(3), idle.read_to_end(&mut rest))
            .await
            .expect("idle connection was not closed")
            .unwrap();
        rest
    });
    while !idle_closed.is_finished() {
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(exchange(&mut active, b"ping").await, b"pong");
    }

    assert!(idle_closed.await.unwrap().is_empty());
    assert!(started.elapsed() >= Duration::from_millis(500));

    assert_eq!(exchange(&mut active, b"ping").await, b"pong");
    assert_eq!(exchange(&mut active, b"xyz").await, b"unknown");

    running.stop().await;
}

#[tokio::test]
async fn test_default_read_deadline_is_five_seconds() {
    let options = ServerOptions {
        read_timeout: ServerOptions::default().read_timeout,
        ..local_options()
    };
    let server = Server::new(options);
    server.add_rule(Rule::contains("ping", "pong"));
    let running = start(server).await;

    let mut stream = TcpStream::connect(running.addr).await.unwrap();
    let started = Instant::now();
    let mut rest = Vec::new();
    tokio::time::timeout(Duration::from_secs(8), stream.read_to_end(&mut rest))
        .await
        .expect("connection outlived the default deadline")
        .unwrap();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(4500), "closed after {:?}", elapsed);

    running.stop().await;
}

#[tokio::test]
async fn test_no_match_reply() {
    let server = Server::new(local_options());
    server.add_rule(Rule::regex("^PING$", "PONG").unwrap());
    let running = start(server).await;

    let mut stream = TcpStream::connect(running.addr).await.unwrap();
    assert_eq!(exchange(&mut stream, b"PING").await, b"PONG");

    stream.write_all(b"PING!").await.unwrap();
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).await.unwrap();
    assert_eq!(rest, b":) ");

    running.stop().await;
}

#[tokio::test]
async fn test_no_match_close() {
    let options = ServerOptions {
        no_match: NoMatchPolicy::Close,
        ..local_options()
    };
    let server = Server::new(options);
    server.add_rule(Rule::contains("hello", "world"));
    let running = start(server).await;

    let mut stream = TcpStream::connect(running.addr).await.unwrap();
    stream.write_all(b"HELLO").await.unwrap();
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());

    running.stop().await;
}

#[tokio::test]
async fn test_added_rules_apply_to_new_requests() {
    let server = Server::new(local_options());
    let store = server.store();
    server.add_rule(Rule::contains("one", "1"));
    let running = start(server).await;

    let mut stream = TcpStream::connect(running.addr).await.unwrap();
    assert_eq!(exchange(&mut stream, b"one").await, b"1");

    store.append(Rule::contains("two", "2").with_name("two"));
    assert_eq!(exchange(&mut stream, b"two").await, b"2");

    running.stop().await;
}

#[tokio::test]
async fn test_concurrent_clients() {
    let server = Server::new(local_options());
    server.add_rule(Rule::regex(r"^client-(\d+)$", "ok").unwrap());
    let running = start(server).await;

    let mut clients = tokio::task::JoinSet::new();
    for i in 0..16 {
        let addr = running.addr;
        clients.spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            for _ in 0..5 {
                let request = format!("client-{}", i);
                assert_eq!(exchange(&mut stream, request.as_bytes()).await, b"ok");
            }
        });
    }
    while let Some(result) = clients.join_next().await {
        result.unwrap();
    }

    running.stop().await;
}

#[tokio::test]
async fn test_close_keeps_open_sessions() {
    let server = Server::new(local_options());
    server.add_rule(Rule::contains("ping", "pong"));
    let running = start(server).await;
    let addr = running.addr;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    assert_eq!(exchange(&mut stream, b"ping").await, b"pong");

    running.stop().await;

    assert_eq!(exchange(&mut stream, b"ping").await, b"pong");
    assert!(TcpStream::connect(addr).await.is_err());
}
