//! SOCKS5 server
//!
//! Binds the listen socket and hands each accepted connection to its own
//! task. The state built here is shared read-only by every connection.

mod guard;
mod listener;

pub use guard::{ConnectionGuard, ConnectionTracker};
pub use listener::Listener;

use crate::config::Config;
use crate::error::ServerError;
use crate::socks::auth::{authenticators_for, Authenticator};
use crate::socks::RelayOptions;
use crate::transport::{SocketOpts, TcpDialer};
use std::time::Duration;
use tokio::sync::broadcast;

/// Process-lifetime state shared by all connections
#[derive(Debug)]
pub struct ServerContext {
    /// Authenticators in server preference order
    pub authenticators: Vec<Box<dyn Authenticator>>,
    /// Outbound dialer
    pub dialer: TcpDialer,
    /// Relay tuning
    pub relay: RelayOptions,
    /// Bound on negotiation plus request
    pub handshake_timeout: Duration,
    /// Options applied to accepted sockets
    pub socket_opts: SocketOpts,
}

impl ServerContext {
    /// Build the shared state for a configuration
    ///
    /// Fails on any invalid setting other than the port.
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        config.validate_runtime().map_err(ServerError::Config)?;

        let socket_opts = SocketOpts::from_tcp_config(&config.tcp);
        let dialer = TcpDialer::with_defaults()
            .with_socket_opts(socket_opts.clone())
            .with_connect_timeout(config.connect_timeout());

        Ok(ServerContext {
            authenticators: authenticators_for(config),
            dialer,
            relay: RelayOptions {
                buffer_size: config.buffer_size,
                half_close_timeout: config.half_close_timeout(),
            },
            handshake_timeout: config.handshake_timeout(),
            socket_opts,
        })
    }
}

/// Validate, bind and serve until shutdown
pub async fn serve(
    config: Config,
    shutdown_rx: broadcast::Receiver<bool>,
) -> Result<(), ServerError> {
    config.validate().map_err(ServerError::Config)?;
    let listener = Listener::bind(config).await?;
    listener.run(shutdown_rx).await
}
