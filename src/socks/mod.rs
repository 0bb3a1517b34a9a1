//! SOCKS5 protocol engine
//!
//! Everything that happens on one client connection: method negotiation,
//! authentication, request parsing, the reply, and the byte relay.

pub mod address;
pub mod auth;
pub mod command;
pub mod consts;
mod handler;
pub mod relay;
mod session;
mod types;

pub use address::{AddressKind, TargetAddr};
pub use auth::{AuthMethod, AuthOutcome, Authenticator, Negotiated};
pub use handler::handle_connection;
pub use relay::{relay, RelayOptions, RelayStats};
pub use session::Session;
pub use types::{SocksCommand, SocksRequest};

use tokio::io::{AsyncRead, AsyncWrite};

/// A client connection the engine can drive
pub trait SocksStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + ?Sized> SocksStream for T {}
