//! Server configuration types
//!
//! Defines the resolved configuration shared read-only by every connection.

use super::TcpConfig;
use serde::{Deserialize, Deserializer, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default listen port
pub const DEFAULT_PORT: u16 = 1080;

/// Longest username or password the sub-negotiation can carry
pub const MAX_CREDENTIAL_LEN: usize = 255;

fn default_listen_addr() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Default handshake timeout in seconds
fn default_handshake_timeout() -> u64 {
    10
}

/// Default connect timeout in seconds
fn default_connect_timeout() -> u64 {
    10
}

/// Default half-close drain window in seconds
fn default_half_close_timeout() -> u64 {
    2
}

fn default_buffer_size() -> usize {
    8192
}

/// Accepts the port either as a number or as a string ("1080"), which is how
/// the JSON configuration files of earlier deployments store it.
fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortRepr {
        Number(u16),
        Text(String),
    }

    match PortRepr::deserialize(deserializer)? {
        PortRepr::Number(port) => Ok(port),
        PortRepr::Text(text) => text
            .trim()
            .parse()
            .map_err(|e| serde::de::Error::custom(format!("invalid port {:?}: {}", text, e))),
    }
}

/// SOCKS5 server configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address to listen on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: IpAddr,

    /// Port to listen on
    #[serde(
        default = "default_port",
        alias = "Port",
        deserialize_with = "deserialize_port"
    )]
    pub port: u16,

    /// Username for SOCKS5 auth
    #[serde(default, alias = "User", alias = "user")]
    pub username: Option<String>,

    /// Password for SOCKS5 auth
    #[serde(default, alias = "Password")]
    pub password: Option<String>,

    /// Bound on negotiation, authentication and request parsing, in seconds
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout: u64,

    /// Bound on name resolution and each outbound connect, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// How long the relay drains the surviving direction after a half-close, in seconds
    #[serde(default = "default_half_close_timeout")]
    pub half_close_timeout: u64,

    /// Relay copy buffer size in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Maximum concurrently served connections (unbounded when unset)
    #[serde(default)]
    pub max_connections: Option<usize>,

    /// Socket options
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
            username: None,
            password: None,
            handshake_timeout: default_handshake_timeout(),
            connect_timeout: default_connect_timeout(),
            half_close_timeout: default_half_close_timeout(),
            buffer_size: default_buffer_size(),
            max_connections: None,
            tcp: TcpConfig::default(),
        }
    }
}

/// Empty strings count as "not configured"
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Config {
    /// Socket address the listener binds to
    pub fn listen_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_addr, self.port)
    }

    /// Configured username/password pair, if both are present
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (non_empty(&self.username), non_empty(&self.password)) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }

    /// Check if authentication credentials are configured
    pub fn has_credentials(&self) -> bool {
        self.credentials().is_some()
    }

    /// Handshake timeout as a duration
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout)
    }

    /// Connect timeout as a duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Half-close drain window as a duration
    pub fn half_close_timeout(&self) -> Duration {
        Duration::from_secs(self.half_close_timeout)
    }

    /// Check the credential pair alone: both or neither, each within wire limits
    pub fn validate_credentials(&self) -> Result<(), String> {
        let user = non_empty(&self.username);
        let pass = non_empty(&self.password);

        match (user, pass) {
            (Some(_), None) | (None, Some(_)) => {
                return Err("Username and password must be configured together".to_string());
            }
            _ => {}
        }

        if user.is_some_and(|u| u.len() > MAX_CREDENTIAL_LEN) {
            return Err(format!(
                "Username longer than {} bytes",
                MAX_CREDENTIAL_LEN
            ));
        }
        if pass.is_some_and(|p| p.len() > MAX_CREDENTIAL_LEN) {
            return Err(format!(
                "Password longer than {} bytes",
                MAX_CREDENTIAL_LEN
            ));
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Listen port must be between 1 and 65535".to_string());
        }
        self.validate_runtime()
    }

    /// Everything `validate` checks except the port, so an ephemeral port 0 passes
    pub fn validate_runtime(&self) -> Result<(), String> {
        self.validate_credentials()?;
        if self.handshake_timeout == 0 {
            return Err("handshake_timeout must be greater than zero".to_string());
        }
        if self.connect_timeout == 0 {
            return Err("connect_timeout must be greater than zero".to_string());
        }
        if self.buffer_size == 0 {
            return Err("buffer_size must be greater than zero".to_string());
        }
        if self.max_connections == Some(0) {
            return Err("max_connections must be greater than zero when set".to_string());
        }
        Ok(())
    }
}
