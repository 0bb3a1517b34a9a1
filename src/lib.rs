//! # socks5d - Standalone SOCKS5 Proxy Server
//!
//! socks5d accepts SOCKS5 clients over TCP, negotiates an authentication
//! method, and relays the CONNECT tunnel to the requested destination.
//!
//! ## Features
//!
//! - **RFC 1928 CONNECT**: IPv4, IPv6 and domain-name destinations
//! - **RFC 1929 Authentication**: optional single username/password pair
//! - **Half-Close Relay**: end-of-stream is propagated before the tunnel closes
//! - **Embeddable**: bind errors are returned to the caller, never fatal inside
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socks5d::config::Config;
//! use socks5d::server::Listener;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config { port: 1080, ..Default::default() };
//!     let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     let listener = Listener::bind(config).await?;
//!     println!("listening on {}", listener.local_addr());
//!     listener.run(shutdown_rx).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Listener -> handle_connection -> negotiate -> read_request -> dial -> reply -> relay
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod server;
pub mod socks;
pub mod transport;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use error::{DialError, ReplyCode, ServerError, SocksError};
pub use server::{serve, Listener};

/// Version of the socks5d library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "socks5d");
    }
}
