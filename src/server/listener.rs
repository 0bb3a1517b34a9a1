//! TCP accept loop

use super::guard::ConnectionTracker;
use super::ServerContext;
use crate::config::Config;
use crate::error::ServerError;
use crate::socks::handle_connection;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Pause after a failed accept before trying again
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// A bound SOCKS5 listener
#[derive(Debug)]
pub struct Listener {
    listener: TcpListener,
    local_addr: SocketAddr,
    ctx: Arc<ServerContext>,
    tracker: ConnectionTracker,
}

impl Listener {
    /// Bind the configured address
    ///
    /// Port 0 picks an ephemeral port; see [`Listener::local_addr`]. Every
    /// other setting is validated before the socket is bound.
    pub async fn bind(config: Config) -> Result<Self, ServerError> {
        let ctx = ServerContext::from_config(&config)?;
        let addr = config.listen_socket_addr();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        info!("SOCKS5 server listening on {}", local_addr);
        if config.has_credentials() {
            info!("Username/password authentication enabled");
        }

        Ok(Listener {
            listener,
            local_addr,
            ctx: Arc::new(ctx),
            tracker: ConnectionTracker::new(config.max_connections),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until shutdown is signalled
    ///
    /// Accept errors are logged and do not stop the loop. Connections
    /// already being served keep running after shutdown.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<bool>) -> Result<(), ServerError> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => self.spawn_connection(stream, peer),
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            // Persistent failures such as EMFILE would otherwise spin
                            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping listener");
                    break;
                }
            }
        }

        info!("Listener on {} stopped", self.local_addr);
        Ok(())
    }

    fn spawn_connection(&self, stream: tokio::net::TcpStream, peer: SocketAddr) {
        let Some(guard) = self.tracker.try_acquire() else {
            warn!("Connection limit reached, rejecting {}", peer);
            return;
        };

        self.ctx.socket_opts.hint(&stream);

        let ctx = Arc::clone(&self.ctx);
        let span = info_span!("conn", %peer);
        tokio::spawn(
            async move {
                debug!("Accepted connection");
                let _guard = guard;
                let _ = handle_connection(stream, peer, &ctx).await;
            }
            .instrument(span),
        );
    }
}
