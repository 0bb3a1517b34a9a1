//! SOCKS5 authentication module
//!
//! Handles method negotiation and dispatches to the selected authenticator.

mod none;
mod password;

pub use none::NoAuth;
pub use password::{CredentialStore, StaticCredentials, UserPassword};

use super::consts::*;
use super::SocksStream;
use crate::config::Config;
use crate::error::SocksError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

/// Authentication method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// No authentication required
    NoAuth,
    /// Username/password authentication
    UserPassword,
    /// No acceptable method was offered
    NoAcceptable,
}

impl AuthMethod {
    /// Convert to SOCKS5 method byte
    pub fn to_byte(self) -> u8 {
        match self {
            AuthMethod::NoAuth => SOCKS5_AUTH_METHOD_NONE,
            AuthMethod::UserPassword => SOCKS5_AUTH_METHOD_PASSWORD,
            AuthMethod::NoAcceptable => SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE,
        }
    }

    /// Parse from SOCKS5 method byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_AUTH_METHOD_NONE => Some(AuthMethod::NoAuth),
            SOCKS5_AUTH_METHOD_PASSWORD => Some(AuthMethod::UserPassword),
            SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE => Some(AuthMethod::NoAcceptable),
            _ => None,
        }
    }
}

/// Result of an authenticator's sub-negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Client may proceed to the request stage
    Accepted {
        /// Authenticated user, when the method carries one
        identity: Option<String>,
    },
    /// Client must be disconnected
    Rejected,
}

/// A server-side authentication method
///
/// Runs after the method selection has been written; implementations own
/// any sub-negotiation bytes on the wire.
#[async_trait]
pub trait Authenticator: Send + Sync + Debug {
    /// Method byte this authenticator answers to
    fn method(&self) -> AuthMethod;

    /// Run the sub-negotiation on the client stream
    async fn negotiate(&self, stream: &mut dyn SocksStream) -> Result<AuthOutcome, SocksError>;
}

/// Outcome of a successful negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    /// Method that was selected
    pub method: AuthMethod,
    /// Authenticated user, if any
    pub identity: Option<String>,
}

/// Build the authenticator list for a configuration
///
/// Username/password when a credential pair is configured, otherwise no
/// authentication.
pub fn authenticators_for(config: &Config) -> Vec<Box<dyn Authenticator>> {
    match config.credentials() {
        Some((username, password)) => {
            let store = StaticCredentials::new(username, password);
            vec![Box::new(UserPassword::new(Arc::new(store)))]
        }
        None => vec![Box::new(NoAuth)],
    }
}

/// Perform method negotiation and authentication
///
/// # Protocol
///
/// ```text
/// +----+----------+----------+        +----+--------+
/// |VER | NMETHODS | METHODS  |  --->  |VER | METHOD |
/// +----+----------+----------+        +----+--------+
/// | 1  |    1     | 1 to 255 |        | 1  |   1    |
/// +----+----------+----------+        +----+--------+
/// ```
///
/// A greeting with the wrong version is dropped without an answer.
pub async fn negotiate<S>(
    stream: &mut S,
    authenticators: &[Box<dyn Authenticator>],
) -> Result<Negotiated, SocksError>
where
    S: SocksStream,
{
    let version = stream.read_u8().await?;
    if version != SOCKS5_VERSION {
        return Err(SocksError::ProtocolVersionMismatch(version));
    }

    let num_methods = stream.read_u8().await? as usize;
    let mut methods = vec![0u8; num_methods];
    stream.read_exact(&mut methods).await?;

    let selected = select_authenticator(&methods, authenticators);
    let method_byte = selected
        .map(|auth| auth.method().to_byte())
        .unwrap_or(SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE);

    stream.write_all(&[SOCKS5_VERSION, method_byte]).await?;
    stream.flush().await?;

    let authenticator = selected.ok_or(SocksError::NoAcceptableMethod)?;
    let method = authenticator.method();
    debug!("Selected authentication method: {:?}", method);

    match authenticator.negotiate(stream).await? {
        AuthOutcome::Accepted { identity } => Ok(Negotiated { method, identity }),
        AuthOutcome::Rejected => Err(SocksError::AuthFailed),
    }
}

/// First configured authenticator, in server preference order, that the client offered
fn select_authenticator<'a>(
    methods: &[u8],
    authenticators: &'a [Box<dyn Authenticator>],
) -> Option<&'a dyn Authenticator> {
    authenticators
        .iter()
        .find(|auth| methods.contains(&auth.method().to_byte()))
        .map(|auth| auth.as_ref())
}
