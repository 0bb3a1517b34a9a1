//! Per-connection session state

use super::auth::{self, AuthMethod, Authenticator};
use super::command::{self, send_failure, send_success};
use super::relay::{relay, RelayOptions, RelayStats};
use super::types::{SocksCommand, SocksRequest};
use super::{SocksStream, TargetAddr};
use crate::error::SocksError;
use crate::transport::{TcpDialer, Upstream};
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// One client connection, advanced stage by stage
///
/// Owned by the task serving the connection; nothing in it is shared.
#[derive(Debug)]
pub struct Session<S> {
    client: S,
    peer: SocketAddr,
    method: Option<AuthMethod>,
    identity: Option<String>,
    command: Option<SocksCommand>,
    target: Option<TargetAddr>,
    upstream: Option<Upstream>,
}

impl<S: SocksStream> Session<S> {
    /// Start a session for a freshly accepted client
    pub fn new(client: S, peer: SocketAddr) -> Self {
        Session {
            client,
            peer,
            method: None,
            identity: None,
            command: None,
            target: None,
            upstream: None,
        }
    }

    /// Client address
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Negotiated authentication method
    pub fn method(&self) -> Option<AuthMethod> {
        self.method
    }

    /// Authenticated user, if the method carries one
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Requested command
    pub fn command(&self) -> Option<SocksCommand> {
        self.command
    }

    /// Requested destination
    pub fn target(&self) -> Option<&TargetAddr> {
        self.target.as_ref()
    }

    /// Local address of the upstream socket once dialed
    pub fn bound_addr(&self) -> Option<SocketAddr> {
        self.upstream.as_ref().map(|u| u.local_addr)
    }

    /// Greeting, method selection and the selected sub-negotiation
    pub async fn negotiate(
        &mut self,
        authenticators: &[Box<dyn Authenticator>],
    ) -> Result<(), SocksError> {
        let negotiated = auth::negotiate(&mut self.client, authenticators).await?;
        self.method = Some(negotiated.method);
        self.identity = negotiated.identity;
        Ok(())
    }

    /// Read the request that follows a successful negotiation
    pub async fn read_request(&mut self) -> Result<SocksRequest, SocksError> {
        let request = command::read_request(&mut self.client).await?;
        self.command = Some(request.command);
        self.target = Some(request.target.clone());
        Ok(request)
    }

    /// Open the upstream connection for the stored target
    pub async fn connect(&mut self, dialer: &TcpDialer) -> Result<SocketAddr, SocksError> {
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| SocksError::MalformedRequest("no target requested".to_string()))?;

        let upstream = dialer.dial(target).await?;
        let local_addr = upstream.local_addr;
        debug!("Upstream {} connected via {}", upstream.peer_addr, local_addr);
        self.upstream = Some(upstream);
        Ok(local_addr)
    }

    /// Tell the client the tunnel is open
    pub async fn reply_success(&mut self) -> Result<(), SocksError> {
        let bound = self
            .bound_addr()
            .ok_or_else(|| SocksError::MalformedRequest("no upstream connected".to_string()))?;
        send_success(&mut self.client, bound).await
    }

    /// Relay bytes until both directions are done
    ///
    /// A session without an upstream has nothing to relay and ends at once.
    pub async fn relay(self, options: &RelayOptions) -> RelayStats {
        match self.upstream {
            Some(upstream) => relay(self.client, upstream.stream, options).await,
            None => RelayStats::default(),
        }
    }

    /// Answer the failure when it has a reply, then close the client
    pub async fn abort(mut self, err: &SocksError) {
        if let Some(code) = err.reply_code() {
            if let Err(e) = send_failure(&mut self.client, code).await {
                debug!("Failed to send {:?} reply: {}", code, e);
            }
        }
        let _ = self.client.shutdown().await;
    }
}
