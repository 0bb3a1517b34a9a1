//! Username/password authentication handler
//!
//! Implements RFC 1929 username/password authentication for SOCKS5.

use super::{AuthMethod, AuthOutcome, Authenticator};
use crate::error::SocksError;
use crate::socks::consts::{SOCKS5_AUTH_FAILURE, SOCKS5_AUTH_SUCCESS, SOCKS5_AUTH_VERSION};
use crate::socks::SocksStream;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Source of valid username/password pairs
pub trait CredentialStore: Send + Sync + fmt::Debug {
    /// Exact, case-sensitive byte comparison against the stored pair(s)
    fn valid(&self, username: &[u8], password: &[u8]) -> bool;
}

/// A single configured credential pair
#[derive(Clone)]
pub struct StaticCredentials {
    username: String,
    password: String,
}

impl StaticCredentials {
    /// Create a store holding one pair
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl CredentialStore for StaticCredentials {
    fn valid(&self, username: &[u8], password: &[u8]) -> bool {
        username == self.username.as_bytes() && password == self.password.as_bytes()
    }
}

/// Username/password authenticator
#[derive(Debug, Clone)]
pub struct UserPassword {
    store: Arc<dyn CredentialStore>,
}

impl UserPassword {
    /// Create an authenticator backed by the given store
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Authenticator for UserPassword {
    fn method(&self) -> AuthMethod {
        AuthMethod::UserPassword
    }

    /// Perform username/password authentication
    ///
    /// # Protocol
    ///
    /// Client sends:
    /// ```text
    /// +----+------+----------+------+----------+
    /// |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
    /// +----+------+----------+------+----------+
    /// | 1  |  1   | 1 to 255 |  1   | 1 to 255 |
    /// +----+------+----------+------+----------+
    /// ```
    ///
    /// Server responds:
    /// ```text
    /// +----+--------+
    /// |VER | STATUS |
    /// +----+--------+
    /// | 1  |   1    |
    /// +----+--------+
    /// ```
    async fn negotiate(&self, stream: &mut dyn SocksStream) -> Result<AuthOutcome, SocksError> {
        let version = stream.read_u8().await?;
        if version != SOCKS5_AUTH_VERSION {
            send_auth_result(stream, SOCKS5_AUTH_FAILURE).await?;
            return Err(SocksError::MalformedRequest(format!(
                "Invalid auth version: {}",
                version
            )));
        }

        let username_len = stream.read_u8().await? as usize;
        let mut username = vec![0u8; username_len];
        stream.read_exact(&mut username).await?;

        let password_len = stream.read_u8().await? as usize;
        let mut password = vec![0u8; password_len];
        stream.read_exact(&mut password).await?;

        let user = String::from_utf8_lossy(&username).into_owned();

        if self.store.valid(&username, &password) {
            send_auth_result(stream, SOCKS5_AUTH_SUCCESS).await?;
            debug!("Authentication successful for user: {}", user);
            Ok(AuthOutcome::Accepted {
                identity: Some(user),
            })
        } else {
            send_auth_result(stream, SOCKS5_AUTH_FAILURE).await?;
            debug!("Authentication failed for user: {}", user);
            Ok(AuthOutcome::Rejected)
        }
    }
}

/// Send authentication result to client
async fn send_auth_result<S>(stream: &mut S, status: u8) -> Result<(), SocksError>
where
    S: AsyncWrite + Unpin + ?Sized,
{
    stream.write_all(&[SOCKS5_AUTH_VERSION, status]).await?;
    stream.flush().await?;
    Ok(())
}
