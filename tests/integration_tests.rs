//! Integration tests for the chat relay
//!
//! These tests run the real acceptor, reader/writer tasks and relay actor on a
//! loopback port and talk to them over TCP.

use server::config::RelayConfig;
use server::network::Server;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

/// Lets the relay catch up with connects and sends
const SETTLE: Duration = Duration::from_millis(100);

async fn start_relay(config: RelayConfig) -> SocketAddr {
    let config = RelayConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..config
    };
    let server = Server::bind(config).await.expect("relay should bind");
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).await.expect("should connect");
    stream.set_nodelay(true).unwrap();
    sleep(SETTLE).await;
    stream
}

/// Reads everything that arrives until the socket goes quiet or closes
async fn read_available(stream: &mut TcpStream, quiet: Duration) -> (Vec<u8>, bool) {
    let mut received = Vec::new();
    let mut buffer = [0u8; 1024];
    loop {
        match timeout(quiet, stream.read(&mut buffer)).await {
            Ok(Ok(0)) => return (received, true),
            Ok(Ok(n)) => received.extend_from_slice(&buffer[..n]),
            Ok(Err(_)) => return (received, true),
            Err(_) => return (received, false),
        }
    }
}

/// BROADCAST TESTS
mod broadcast_tests {
    use super::*;

    /// A message reaches every other client byte-for-byte, never the sender
    #[tokio::test]
    async fn message_reaches_all_but_sender() {
        let addr = start_relay(RelayConfig {
            message_rate: Duration::ZERO,
            ..RelayConfig::default()
        })
        .await;

        let mut a = connect(addr).await;
        let mut b = connect(addr).await;
        let mut c = connect(addr).await;

        a.write_all(b"hello from a\r\n").await.unwrap();

        let (to_b, _) = read_available(&mut b, Duration::from_millis(300)).await;
        let (to_c, _) = read_available(&mut c, Duration::from_millis(300)).await;
        let (to_a, _) = read_available(&mut a, Duration::from_millis(300)).await;

        assert_eq!(to_b, b"hello from a\r\n");
        assert_eq!(to_c, b"hello from a\r\n");
        assert!(to_a.is_empty());
    }

    /// A client that left no longer receives anything, and the others carry on
    #[tokio::test]
    async fn disconnected_client_is_skipped() {
        let addr = start_relay(RelayConfig {
            message_rate: Duration::ZERO,
            ..RelayConfig::default()
        })
        .await;

        let mut a = connect(addr).await;
        let b = connect(addr).await;
        let mut c = connect(addr).await;

        drop(b);
        sleep(SETTLE).await;

        a.write_all(b"still here?\n").await.unwrap();
        let (to_c, closed) = read_available(&mut c, Duration::from_millis(300)).await;

        assert_eq!(to_c, b"still here?\n");
        assert!(!closed);
    }

    /// Concurrent senders: every message arrives exactly once at an observer
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_senders_all_delivered() {
        let addr = start_relay(RelayConfig {
            message_rate: Duration::ZERO,
            outbound_capacity: 256,
            ..RelayConfig::default()
        })
        .await;

        let mut observer = connect(addr).await;
        let senders = 20;

        let mut streams = Vec::new();
        for _ in 0..senders {
            streams.push(TcpStream::connect(addr).await.unwrap());
        }
        sleep(SETTLE).await;

        let mut handles = Vec::new();
        for (i, mut stream) in streams.into_iter().enumerate() {
            handles.push(tokio::spawn(async move {
                stream
                    .write_all(format!("msg-{:02}\n", i).as_bytes())
                    .await
                    .unwrap();
                stream
            }));
        }
        let mut streams = Vec::new();
        for handle in handles {
            streams.push(handle.await.unwrap());
        }

        let (received, _) = read_available(&mut observer, Duration::from_millis(500)).await;
        let text = String::from_utf8(received).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        let unique: HashSet<&str> = lines.iter().copied().collect();

        assert_eq!(lines.len(), senders);
        assert_eq!(unique.len(), senders);
        for i in 0..senders {
            assert!(unique.contains(format!("msg-{:02}", i).as_str()));
        }
    }
}

/// RATE LIMIT AND BAN TESTS
mod abuse_tests {
    use super::*;

    /// Messages inside the rate window are dropped; spaced ones go through
    #[tokio::test]
    async fn rapid_messages_are_throttled() {
        let rate = Duration::from_millis(300);
        let addr = start_relay(RelayConfig {
            message_rate: rate,
            strike_limit: 10,
            ..RelayConfig::default()
        })
        .await;

        let mut a = connect(addr).await;
        let mut b = connect(addr).await;
        sleep(rate).await;

        a.write_all(b"one\n").await.unwrap();
        sleep(Duration::from_millis(30)).await;
        a.write_all(b"two\n").await.unwrap();
        sleep(rate).await;
        a.write_all(b"three\n").await.unwrap();

        let (to_b, closed) = read_available(&mut b, Duration::from_millis(300)).await;
        assert_eq!(to_b, b"one\nthree\n");
        assert!(!closed);
    }

    /// Hitting the strike limit bans the IP until the ban runs out
    #[tokio::test]
    async fn strike_limit_bans_ip_until_expiry() {
        let ban_duration = Duration::from_millis(800);
        let addr = start_relay(RelayConfig {
            message_rate: Duration::from_secs(10),
            strike_limit: 3,
            ban_duration,
            ..RelayConfig::default()
        })
        .await;

        let mut spammer = connect(addr).await;
        let mut bystander = connect(addr).await;

        for i in 0..3 {
            spammer
                .write_all(format!("spam {}\n", i).as_bytes())
                .await
                .unwrap();
            sleep(Duration::from_millis(30)).await;
        }

        let (notice, closed) = read_available(&mut spammer, Duration::from_millis(300)).await;
        assert_eq!(notice, shared::BAN_NOTICE);
        assert!(closed);

        let (to_bystander, closed) = read_available(&mut bystander, Duration::from_millis(100)).await;
        assert!(to_bystander.is_empty());
        assert!(!closed);

        // Same IP comes back while banned
        let mut retry = TcpStream::connect(addr).await.unwrap();
        let (notice, closed) = read_available(&mut retry, Duration::from_millis(300)).await;
        assert_eq!(notice, shared::BAN_NOTICE);
        assert!(closed);

        sleep(ban_duration).await;

        let mut after = TcpStream::connect(addr).await.unwrap();
        let (received, closed) = read_available(&mut after, Duration::from_millis(300)).await;
        assert!(received.is_empty());
        assert!(!closed);
    }
}

/// CLIENT TESTS
mod client_tests {
    use super::*;
    use client::network::{run_session, SessionEnd};
    use tokio::io::BufReader;

    /// The terminal client forwards typed lines and prints relayed ones
    #[tokio::test]
    async fn client_session_against_relay() {
        let addr = start_relay(RelayConfig {
            message_rate: Duration::ZERO,
            ..RelayConfig::default()
        })
        .await;

        let mut listener = connect(addr).await;
        let stream = client::network::connect(&addr.to_string()).await.unwrap();
        sleep(SETTLE).await;

        let input: &[u8] = b"hi from the client\n";
        let mut output = Vec::new();
        let end = run_session(stream, BufReader::new(input), &mut output)
            .await
            .unwrap();
        assert_eq!(end, SessionEnd::InputClosed);

        let (received, _) = read_available(&mut listener, Duration::from_millis(300)).await;
        assert_eq!(received, b"hi from the client\n");
    }

    /// A banned client's session ends with the ban notice on screen
    #[tokio::test]
    async fn client_session_ends_on_ban() {
        let addr = start_relay(RelayConfig {
            message_rate: Duration::from_secs(10),
            strike_limit: 1,
            ..RelayConfig::default()
        })
        .await;

        let stream = client::network::connect(&addr.to_string()).await.unwrap();
        sleep(SETTLE).await;

        let (mut keyboard, input) = tokio::io::duplex(64);
        keyboard.write_all(b"too fast\n").await.unwrap();

        let mut output = Vec::new();
        let end = timeout(
            Duration::from_secs(2),
            run_session(stream, BufReader::new(input), &mut output),
        )
        .await
        .expect("session should end")
        .unwrap();

        assert_eq!(end, SessionEnd::ServerClosed);
        assert_eq!(output, shared::BAN_NOTICE);
    }
}
