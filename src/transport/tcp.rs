//! TCP dialer
//!
//! Opens the upstream connection for a CONNECT request.

use super::SocketOpts;
use crate::error::DialError;
use crate::socks::address::TargetAddr;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// An established upstream connection
#[derive(Debug)]
pub struct Upstream {
    /// Connected socket
    pub stream: TcpStream,
    /// Local end of the socket, reported to the client as BND.ADDR
    pub local_addr: SocketAddr,
    /// Address that accepted the connection
    pub peer_addr: SocketAddr,
}

/// Dials TCP connections with a per-attempt timeout
#[derive(Debug, Clone)]
pub struct TcpDialer {
    /// Socket options to apply to connections
    socket_opts: SocketOpts,
    /// Bound on resolution and on each connect attempt
    connect_timeout: Duration,
}

impl TcpDialer {
    /// Create a new dialer with default options
    pub fn with_defaults() -> Self {
        TcpDialer {
            socket_opts: SocketOpts::default(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Set socket options
    pub fn with_socket_opts(mut self, opts: SocketOpts) -> Self {
        self.socket_opts = opts;
        self
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Resolve the target into candidate socket addresses
    async fn resolve(&self, target: &TargetAddr) -> Result<Vec<SocketAddr>, DialError> {
        match target {
            TargetAddr::Ip(addr) => Ok(vec![*addr]),
            TargetAddr::Domain(host, port) => {
                let lookup = tokio::net::lookup_host((host.as_str(), *port));
                let addrs = tokio::time::timeout(self.connect_timeout, lookup)
                    .await
                    .map_err(|_| DialError::Resolve {
                        host: host.clone(),
                        source: io::Error::new(io::ErrorKind::TimedOut, "lookup timed out"),
                    })?
                    .map_err(|source| DialError::Resolve {
                        host: host.clone(),
                        source,
                    })?
                    .collect::<Vec<_>>();

                if addrs.is_empty() {
                    return Err(DialError::NoAddresses(host.clone()));
                }
                Ok(addrs)
            }
        }
    }

    /// Connect to the target, trying each resolved address in order
    ///
    /// The error from the last attempt is returned when all of them fail.
    pub async fn dial(&self, target: &TargetAddr) -> Result<Upstream, DialError> {
        let addrs = self.resolve(target).await?;

        let mut last_err = None;
        for addr in addrs {
            match self.connect_one(addr).await {
                Ok(upstream) => return Ok(upstream),
                Err(e) => {
                    debug!("Connect attempt to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| DialError::NoAddresses(target.to_string())))
    }

    async fn connect_one(&self, addr: SocketAddr) -> Result<Upstream, DialError> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| DialError::Timeout(addr))?
            .map_err(|source| DialError::Connect { addr, source })?;

        self.socket_opts.hint(&stream);

        let local_addr = stream
            .local_addr()
            .map_err(|source| DialError::Connect { addr, source })?;
        let peer_addr = stream.peer_addr().unwrap_or(addr);

        debug!("TCP connection established to {}", peer_addr);

        Ok(Upstream {
            stream,
            local_addr,
            peer_addr,
        })
    }
}

impl Default for TcpDialer {
    fn default() -> Self {
        Self::with_defaults()
    }
}
