//! Bidirectional byte relay for an established CONNECT tunnel
//!
//! Both directions are copied concurrently. When one direction reaches EOF
//! the write half it was feeding is shut down, and the opposite direction is
//! given `half_close_timeout` to drain before both streams are dropped. An
//! I/O error on either direction ends the relay at once.

use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Relay tuning knobs
#[derive(Debug, Clone, Copy)]
pub struct RelayOptions {
    /// Per-direction copy buffer
    pub buffer_size: usize,
    /// How long the other direction may keep flowing after one side closed
    pub half_close_timeout: Duration,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            buffer_size: 8192,
            half_close_timeout: Duration::from_secs(2),
        }
    }
}

/// Bytes moved in each direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Client to upstream
    pub client_to_upstream: u64,
    /// Upstream to client
    pub upstream_to_client: u64,
}

impl RelayStats {
    /// Sum of both directions
    pub fn total(&self) -> u64 {
        self.client_to_upstream + self.upstream_to_client
    }
}

/// Copy one direction until EOF, then shut the writer down
///
/// Returns the byte count and, if the direction ended on an error, that error.
async fn pipe<R, W>(mut reader: R, mut writer: W, buffer_size: usize) -> (u64, Option<io::Error>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => return (total, Some(e)),
        };
        if let Err(e) = writer.write_all(&buf[..n]).await {
            return (total, Some(e));
        }
        total += n as u64;
    }

    // Propagate EOF as a half-close; a peer that already went away is fine
    let _ = writer.shutdown().await;
    (total, None)
}

enum Finished {
    ClientSide((u64, Option<io::Error>)),
    UpstreamSide((u64, Option<io::Error>)),
}

/// Relay data between the client and the upstream until both sides are done
///
/// Never fails: errors on either side simply end the relay.
pub async fn relay<C, U>(client: C, upstream: U, options: &RelayOptions) -> RelayStats
where
    C: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    let (client_read, client_write) = tokio::io::split(client);
    let (upstream_read, upstream_write) = tokio::io::split(upstream);

    let client_to_upstream = pipe(client_read, upstream_write, options.buffer_size);
    let upstream_to_client = pipe(upstream_read, client_write, options.buffer_size);
    tokio::pin!(client_to_upstream);
    tokio::pin!(upstream_to_client);

    let first = tokio::select! {
        result = &mut client_to_upstream => Finished::ClientSide(result),
        result = &mut upstream_to_client => Finished::UpstreamSide(result),
    };

    let mut stats = RelayStats::default();
    match first {
        Finished::ClientSide((bytes, err)) => {
            stats.client_to_upstream = bytes;
            match err {
                Some(e) => debug!("Client->upstream error: {}", e),
                None => {
                    debug!("Client closed, draining upstream");
                    if let Ok((bytes, err)) =
                        tokio::time::timeout(options.half_close_timeout, &mut upstream_to_client)
                            .await
                    {
                        stats.upstream_to_client = bytes;
                        if let Some(e) = err {
                            debug!("Upstream->client error: {}", e);
                        }
                    }
                }
            }
        }
        Finished::UpstreamSide((bytes, err)) => {
            stats.upstream_to_client = bytes;
            match err {
                Some(e) => debug!("Upstream->client error: {}", e),
                None => {
                    debug!("Upstream closed, draining client");
                    if let Ok((bytes, err)) =
                        tokio::time::timeout(options.half_close_timeout, &mut client_to_upstream)
                            .await
                    {
                        stats.client_to_upstream = bytes;
                        if let Some(e) = err {
                            debug!("Client->upstream error: {}", e);
                        }
                    }
                }
            }
        }
    }

    debug!(
        "Relay finished: {} bytes up, {} bytes down",
        stats.client_to_upstream, stats.upstream_to_client
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    fn options() -> RelayOptions {
        RelayOptions {
            buffer_size: 16,
            half_close_timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn test_relay_both_directions() {
        let (mut client, server_side) = duplex(1024);
        let (upstream_side, mut upstream) = duplex(1024);

        let handle = tokio::spawn(async move { relay(server_side, upstream_side, &options()).await });

        client.write_all(b"hello from client").await.unwrap();
        let mut buf = [0u8; 17];
        upstream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello from client");

        upstream.write_all(b"hello back").await.unwrap();
        let mut buf = [0u8; 10];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello back");

        drop(client);
        drop(upstream);

        let stats = handle.await.unwrap();
        assert_eq!(stats.client_to_upstream, 17);
        assert_eq!(stats.upstream_to_client, 10);
        assert_eq!(stats.total(), 27);
    }

    #[tokio::test]
    async fn test_relay_client_eof_reaches_upstream() {
        let (mut client, server_side) = duplex(1024);
        let (upstream_side, mut upstream) = duplex(1024);

        let handle = tokio::spawn(async move { relay(server_side, upstream_side, &options()).await });

        client.write_all(b"request").await.unwrap();
        client.shutdown().await.unwrap();

        let mut received = Vec::new();
        upstream.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"request");

        // The reverse direction still works during the drain window
        upstream.write_all(b"response").await.unwrap();
        drop(upstream);

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert_eq!(response, b"response");

        let stats = handle.await.unwrap();
        assert_eq!(stats.client_to_upstream, 7);
        assert_eq!(stats.upstream_to_client, 8);
    }

    #[tokio::test]
    async fn test_relay_upstream_eof_reaches_client() {
        let (mut client, server_side) = duplex(1024);
        let (upstream_side, mut upstream) = duplex(1024);

        let handle = tokio::spawn(async move { relay(server_side, upstream_side, &options()).await });

        upstream.write_all(b"banner").await.unwrap();
        drop(upstream);

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"banner");

        let stats = handle.await.unwrap();
        assert_eq!(stats.upstream_to_client, 6);
    }

    #[tokio::test]
    async fn test_relay_half_close_timeout_bounds_drain() {
        let (mut client, server_side) = duplex(1024);
        let (upstream_side, _upstream) = duplex(1024);

        let handle = tokio::spawn(async move { relay(server_side, upstream_side, &options()).await });

        client.shutdown().await.unwrap();

        // Upstream never closes; the relay must still end after the drain window
        let stats = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("relay did not honour the half-close timeout")
            .unwrap();
        assert_eq!(stats, RelayStats::default());
    }

    #[tokio::test]
    async fn test_relay_larger_than_buffer() {
        let (mut client, server_side) = duplex(64);
        let (upstream_side, mut upstream) = duplex(64);

        let handle = tokio::spawn(async move { relay(server_side, upstream_side, &options()).await });

        let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let expected = payload.clone();
        let writer = tokio::spawn(async move {
            client.write_all(&payload).await.unwrap();
            client.shutdown().await.unwrap();
            client
        });

        let mut received = Vec::new();
        upstream.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, expected);

        drop(upstream);
        drop(writer.await.unwrap());
        let stats = handle.await.unwrap();
        assert_eq!(stats.client_to_upstream, 4096);
    }
}
