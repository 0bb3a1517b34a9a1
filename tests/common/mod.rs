//! Test utilities for socks5d
//!
//! Shared helpers for the integration tests: a local echo server, a server
//! bootstrap on an ephemeral port, and a minimal SOCKS5 client.

#![allow(dead_code)]

use socks5d::config::Config;
use socks5d::server::Listener;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Spawn a server that echoes every byte back until the peer closes
pub async fn spawn_echo_server() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut r, mut w) = stream.split();
                let _ = tokio::io::copy(&mut r, &mut w).await;
            });
        }
    });
    addr
}

/// Running server handle; dropping it stops the accept loop
pub struct TestServer {
    /// Address the server listens on
    pub addr: SocketAddr,
    shutdown_tx: broadcast::Sender<bool>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Test configuration builder
#[derive(Default)]
pub struct TestConfigBuilder {
    credentials: Option<(String, String)>,
    max_connections: Option<usize>,
    handshake_timeout: Option<u64>,
}

impl TestConfigBuilder {
    /// Create a new test config builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Require username/password authentication
    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some((username.to_string(), password.to_string()));
        self
    }

    /// Limit concurrent connections
    pub fn max_connections(mut self, limit: usize) -> Self {
        self.max_connections = Some(limit);
        self
    }

    /// Handshake timeout in seconds
    pub fn handshake_timeout(mut self, secs: u64) -> Self {
        self.handshake_timeout = Some(secs);
        self
    }

    /// Build the configuration, bound to an ephemeral loopback port
    pub fn build(self) -> Config {
        let mut config = Config {
            listen_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            max_connections: self.max_connections,
            ..Default::default()
        };
        if let Some((username, password)) = self.credentials {
            config.username = Some(username);
            config.password = Some(password);
        }
        if let Some(secs) = self.handshake_timeout {
            config.handshake_timeout = secs;
        }
        config
    }

    /// Bind and run a server with this configuration
    pub async fn start(self) -> TestServer {
        start_server(self.build()).await
    }
}

/// Bind a listener and run it in the background
pub async fn start_server(config: Config) -> TestServer {
    let listener = Listener::bind(config).await.unwrap();
    let addr = listener.local_addr();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(listener.run(shutdown_rx));
    TestServer { addr, shutdown_tx }
}

/// Greeting plus method selection; returns the selected method
pub async fn greet(stream: &mut TcpStream, methods: &[u8]) -> u8 {
    let mut greeting = vec![0x05, methods.len() as u8];
    greeting.extend_from_slice(methods);
    stream.write_all(&greeting).await.unwrap();

    let mut selection = [0u8; 2];
    stream.read_exact(&mut selection).await.unwrap();
    assert_eq!(selection[0], 0x05);
    selection[1]
}

/// Username/password sub-negotiation; returns the status byte
pub async fn authenticate(stream: &mut TcpStream, username: &str, password: &str) -> u8 {
    let mut request = vec![0x01, username.len() as u8];
    request.extend_from_slice(username.as_bytes());
    request.push(password.len() as u8);
    request.extend_from_slice(password.as_bytes());
    stream.write_all(&request).await.unwrap();

    let mut status = [0u8; 2];
    stream.read_exact(&mut status).await.unwrap();
    assert_eq!(status[0], 0x01);
    status[1]
}

/// Encode a request for an IP destination
pub fn ip_request(cmd: u8, addr: SocketAddr) -> Vec<u8> {
    let mut request = vec![0x05, cmd, 0x00];
    match addr {
        SocketAddr::V4(v4) => {
            request.push(0x01);
            request.extend_from_slice(&v4.ip().octets());
        }
        SocketAddr::V6(v6) => {
            request.push(0x04);
            request.extend_from_slice(&v6.ip().octets());
        }
    }
    request.extend_from_slice(&addr.port().to_be_bytes());
    request
}

/// Encode a request for a domain destination
pub fn domain_request(cmd: u8, domain: &str, port: u16) -> Vec<u8> {
    let mut request = vec![0x05, cmd, 0x00, 0x03, domain.len() as u8];
    request.extend_from_slice(domain.as_bytes());
    request.extend_from_slice(&port.to_be_bytes());
    request
}

/// Send a request and read the reply; returns (REP, bound address)
///
/// Only IPv4 and IPv6 bound addresses are expected in replies.
pub async fn send_request(stream: &mut TcpStream, request: &[u8]) -> (u8, SocketAddr) {
    stream.write_all(request).await.unwrap();

    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await.unwrap();
    assert_eq!(header[0], 0x05);
    assert_eq!(header[2], 0x00);

    let ip = match header[3] {
        0x01 => {
            let mut octets = [0u8; 4];
            stream.read_exact(&mut octets).await.unwrap();
            IpAddr::from(octets)
        }
        0x04 => {
            let mut octets = [0u8; 16];
            stream.read_exact(&mut octets).await.unwrap();
            IpAddr::from(octets)
        }
        other => panic!("unexpected address type in reply: {}", other),
    };
    let port = stream.read_u16().await.unwrap();
    (header[1], SocketAddr::new(ip, port))
}

/// Open a no-auth CONNECT tunnel through the server
pub async fn connect_through(server: SocketAddr, target: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(server).await.unwrap();
    assert_eq!(greet(&mut stream, &[0x00]).await, 0x00);
    let (rep, _) = send_request(&mut stream, &ip_request(0x01, target)).await;
    assert_eq!(rep, 0x00);
    stream
}

/// Read until the peer closes; a reset counts as closed
pub async fn read_to_close(stream: &mut TcpStream) -> Vec<u8> {
    let mut received = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => received.extend_from_slice(&buf[..n]),
        }
    }
    received
}
