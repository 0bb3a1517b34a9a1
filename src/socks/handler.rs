//! Connection supervisor
//!
//! Drives one accepted client through negotiation, request, dial, reply and
//! relay. Every failure is contained here: it is answered on the wire when
//! the protocol defines a reply, and the connection is closed.

use super::session::Session;
use super::types::SocksCommand;
use super::{RelayStats, SocksStream};
use crate::error::SocksError;
use crate::server::ServerContext;
use std::net::SocketAddr;
use tracing::{debug, info, warn};

/// Serve one client connection to completion
///
/// # Protocol Flow
///
/// 1. Method negotiation and authentication
/// 2. Request parsing
/// 3. Outbound dial (CONNECT only)
/// 4. Success reply carrying the upstream's local address
/// 5. Bidirectional relay
///
/// Steps 1 and 2 share the handshake timeout. The returned error has already
/// been answered and the client closed.
pub async fn handle_connection<S>(
    stream: S,
    peer: SocketAddr,
    ctx: &ServerContext,
) -> Result<RelayStats, SocksError>
where
    S: SocksStream,
{
    let mut session = Session::new(stream, peer);

    if let Err(e) = establish(&mut session, ctx).await {
        log_failure(&e);
        session.abort(&e).await;
        return Err(e);
    }

    let stats = session.relay(&ctx.relay).await;
    info!(
        "Connection closed: {} bytes up, {} bytes down",
        stats.client_to_upstream, stats.upstream_to_client
    );
    Ok(stats)
}

async fn establish<S>(session: &mut Session<S>, ctx: &ServerContext) -> Result<(), SocksError>
where
    S: SocksStream,
{
    let handshake = async {
        session.negotiate(&ctx.authenticators).await?;
        debug!(
            "Negotiated {:?} for {}",
            session.method(),
            session.identity().unwrap_or("anonymous")
        );
        session.read_request().await
    };
    let request = tokio::time::timeout(ctx.handshake_timeout, handshake)
        .await
        .map_err(|_| SocksError::HandshakeTimeout)??;

    info!("SOCKS5 {} request to {}", request.command, request.target);

    match request.command {
        SocksCommand::Connect => {}
        SocksCommand::Bind | SocksCommand::UdpAssociate => {
            return Err(SocksError::CommandNotSupported(request.command.to_byte()));
        }
    }

    let bound = session.connect(&ctx.dialer).await?;
    session.reply_success().await?;

    info!("SOCKS5 tunnel established to {} via {}", request.target, bound);
    Ok(())
}

fn log_failure(err: &SocksError) {
    match err {
        SocksError::Dial(_) | SocksError::AuthFailed | SocksError::HandshakeTimeout => {
            warn!("Connection failed: {}", err)
        }
        _ => debug!("Connection failed: {}", err),
    }
}
