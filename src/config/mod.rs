//! Configuration module for socks5d
//!
//! Loads the optional configuration file and merges command-line overrides
//! on top of it. Precedence is command line, then file, then defaults.

mod server;
mod transport;

pub use server::{Config, DEFAULT_PORT, MAX_CREDENTIAL_LEN};
pub use transport::TcpConfig;

use anyhow::{Context, Result};
use std::net::IpAddr;
use std::path::Path;

/// Values supplied on the command line; `None` leaves the file/default value in place
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Listen address
    pub listen_addr: Option<IpAddr>,
    /// Listen port
    pub port: Option<u16>,
    /// Username
    pub username: Option<String>,
    /// Password
    pub password: Option<String>,
}

impl ConfigOverrides {
    /// Apply the overrides to a configuration. Empty strings do not override.
    pub fn apply(self, mut config: Config) -> Config {
        if let Some(addr) = self.listen_addr {
            config.listen_addr = addr;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(user) = self.username.filter(|u| !u.is_empty()) {
            config.username = Some(user);
        }
        if let Some(pass) = self.password.filter(|p| !p.is_empty()) {
            config.password = Some(pass);
        }
        config
    }
}

/// Load configuration from a file; `.json` is read as JSON, anything else as TOML
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        parse_json_config(&content)
    } else {
        parse_config(&content)
    }
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse configuration")
}

/// Parse configuration from a JSON string
pub fn parse_json_config(content: &str) -> Result<Config> {
    serde_json::from_str(content).with_context(|| "Failed to parse JSON configuration")
}

/// Build the effective configuration from an optional file plus overrides
pub fn resolve_config(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Config> {
    let base = match path {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    Ok(overrides.apply(base))
}
