//! Error types for socks5d
//!
//! Two tiers of failure exist. [`ServerError`] is startup-fatal and is handed
//! back to the caller of the listener. [`SocksError`] is scoped to a single
//! client connection and never escapes its connection task.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Startup-fatal errors surfaced to the embedding caller
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listen socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address the bind was attempted on
        addr: SocketAddr,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Per-connection SOCKS5 errors
#[derive(Error, Debug)]
pub enum SocksError {
    /// Greeting carried a version other than 5
    #[error("Unsupported SOCKS version: {0}")]
    ProtocolVersionMismatch(u8),

    /// None of the offered methods is configured on this server
    #[error("No acceptable authentication method")]
    NoAcceptableMethod,

    /// Username/password sub-negotiation rejected the client
    #[error("Authentication failed")]
    AuthFailed,

    /// Request header violated the wire format
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Command byte outside the known set, or a known command this server does not run
    #[error("Command not supported: {0}")]
    CommandNotSupported(u8),

    /// Address type byte outside the known set
    #[error("Address type not supported: {0}")]
    AddressTypeNotSupported(u8),

    /// Domain name empty, too long, or not valid UTF-8; answered as host unreachable
    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),

    /// Outbound connection could not be established
    #[error(transparent)]
    Dial(#[from] DialError),

    /// Negotiation and request did not finish in time
    #[error("Handshake timed out")]
    HandshakeTimeout,

    /// IO error on the client connection
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl SocksError {
    /// Reply code to send before closing, if the failure has one.
    ///
    /// Errors raised before a reply format exists, or whose sub-protocol
    /// already answered the client, return `None`.
    pub fn reply_code(&self) -> Option<ReplyCode> {
        match self {
            SocksError::CommandNotSupported(_) => Some(ReplyCode::CommandNotSupported),
            SocksError::AddressTypeNotSupported(_) => Some(ReplyCode::AddressTypeNotSupported),
            // An unusable name can never resolve
            SocksError::InvalidDomain(_) => Some(ReplyCode::HostUnreachable),
            SocksError::Dial(e) => Some(e.reply_code()),
            _ => None,
        }
    }
}

/// Outbound dial failures
#[derive(Error, Debug)]
pub enum DialError {
    /// Name resolution failed
    #[error("Failed to resolve {host}: {source}")]
    Resolve {
        /// Host that was looked up
        host: String,
        /// Resolver error
        #[source]
        source: io::Error,
    },

    /// Resolution succeeded but returned nothing
    #[error("No addresses found for {0}")]
    NoAddresses(String),

    /// Connect attempt exceeded the configured timeout
    #[error("Connection to {0} timed out")]
    Timeout(SocketAddr),

    /// Connect attempt failed
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        /// Address the attempt was made to
        addr: SocketAddr,
        /// Socket error
        #[source]
        source: io::Error,
    },
}

impl DialError {
    /// Map the failure onto the SOCKS5 reply byte
    pub fn reply_code(&self) -> ReplyCode {
        match self {
            DialError::Resolve { .. } | DialError::NoAddresses(_) => ReplyCode::HostUnreachable,
            DialError::Timeout(_) => ReplyCode::TtlExpired,
            DialError::Connect { source, .. } => ReplyCode::from(source),
        }
    }
}

/// Reply codes for SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl From<ReplyCode> for u8 {
    fn from(code: ReplyCode) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for ReplyCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(ReplyCode::Succeeded),
            0x01 => Ok(ReplyCode::GeneralFailure),
            0x02 => Ok(ReplyCode::ConnectionNotAllowed),
            0x03 => Ok(ReplyCode::NetworkUnreachable),
            0x04 => Ok(ReplyCode::HostUnreachable),
            0x05 => Ok(ReplyCode::ConnectionRefused),
            0x06 => Ok(ReplyCode::TtlExpired),
            0x07 => Ok(ReplyCode::CommandNotSupported),
            0x08 => Ok(ReplyCode::AddressTypeNotSupported),
            other => Err(other),
        }
    }
}

impl From<&io::Error> for ReplyCode {
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => ReplyCode::ConnectionRefused,
            io::ErrorKind::NetworkUnreachable => ReplyCode::NetworkUnreachable,
            io::ErrorKind::HostUnreachable => ReplyCode::HostUnreachable,
            io::ErrorKind::AddrNotAvailable => ReplyCode::HostUnreachable,
            io::ErrorKind::TimedOut => ReplyCode::TtlExpired,
            io::ErrorKind::PermissionDenied => ReplyCode::ConnectionNotAllowed,
            _ => ReplyCode::GeneralFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_code_wire_values() {
        assert_eq!(u8::from(ReplyCode::Succeeded), 0x00);
        assert_eq!(u8::from(ReplyCode::GeneralFailure), 0x01);
        assert_eq!(u8::from(ReplyCode::ConnectionNotAllowed), 0x02);
        assert_eq!(u8::from(ReplyCode::NetworkUnreachable), 0x03);
        assert_eq!(u8::from(ReplyCode::HostUnreachable), 0x04);
        assert_eq!(u8::from(ReplyCode::ConnectionRefused), 0x05);
        assert_eq!(u8::from(ReplyCode::TtlExpired), 0x06);
        assert_eq!(u8::from(ReplyCode::CommandNotSupported), 0x07);
        assert_eq!(u8::from(ReplyCode::AddressTypeNotSupported), 0x08);
    }

    #[test]
    fn test_reply_code_try_from() {
        for byte in 0x00..=0x08u8 {
            let code = ReplyCode::try_from(byte).unwrap();
            assert_eq!(u8::from(code), byte);
        }
        assert_eq!(ReplyCode::try_from(0x09), Err(0x09));
        assert_eq!(ReplyCode::try_from(0xFF), Err(0xFF));
    }

    #[test]
    fn test_reply_code_from_io_error() {
        let cases = [
            (io::ErrorKind::ConnectionRefused, ReplyCode::ConnectionRefused),
            (io::ErrorKind::NetworkUnreachable, ReplyCode::NetworkUnreachable),
            (io::ErrorKind::HostUnreachable, ReplyCode::HostUnreachable),
            (io::ErrorKind::AddrNotAvailable, ReplyCode::HostUnreachable),
            (io::ErrorKind::TimedOut, ReplyCode::TtlExpired),
            (io::ErrorKind::PermissionDenied, ReplyCode::ConnectionNotAllowed),
            (io::ErrorKind::Other, ReplyCode::GeneralFailure),
        ];

        for (kind, expected) in cases {
            let err = io::Error::new(kind, "test");
            assert_eq!(ReplyCode::from(&err), expected, "kind {:?}", kind);
        }
    }

    #[test]
    fn test_dial_error_reply_codes() {
        let err = DialError::Resolve {
            host: "nowhere.invalid".to_string(),
            source: io::Error::new(io::ErrorKind::Other, "lookup failed"),
        };
        assert_eq!(err.reply_code(), ReplyCode::HostUnreachable);

        let err = DialError::NoAddresses("empty.invalid".to_string());
        assert_eq!(err.reply_code(), ReplyCode::HostUnreachable);

        let err = DialError::Timeout("10.0.0.1:80".parse().unwrap());
        assert_eq!(err.reply_code(), ReplyCode::TtlExpired);

        let err = DialError::Connect {
            addr: "127.0.0.1:9".parse().unwrap(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(err.reply_code(), ReplyCode::ConnectionRefused);
    }

    #[test]
    fn test_socks_error_reply_code() {
        assert_eq!(SocksError::ProtocolVersionMismatch(4).reply_code(), None);
        assert_eq!(SocksError::NoAcceptableMethod.reply_code(), None);
        assert_eq!(SocksError::AuthFailed.reply_code(), None);
        assert_eq!(
            SocksError::MalformedRequest("bad rsv".to_string()).reply_code(),
            None
        );
        assert_eq!(
            SocksError::CommandNotSupported(0x02).reply_code(),
            Some(ReplyCode::CommandNotSupported)
        );
        assert_eq!(
            SocksError::AddressTypeNotSupported(0x09).reply_code(),
            Some(ReplyCode::AddressTypeNotSupported)
        );
        assert_eq!(
            SocksError::InvalidDomain("empty domain name".to_string()).reply_code(),
            Some(ReplyCode::HostUnreachable)
        );
        assert_eq!(SocksError::HandshakeTimeout.reply_code(), None);
    }

    #[test]
    fn test_socks_error_display() {
        let err = SocksError::ProtocolVersionMismatch(4);
        assert_eq!(format!("{}", err), "Unsupported SOCKS version: 4");

        let err = SocksError::NoAcceptableMethod;
        assert_eq!(format!("{}", err), "No acceptable authentication method");

        let err = SocksError::CommandNotSupported(0xFF);
        assert_eq!(format!("{}", err), "Command not supported: 255");

        let err = SocksError::AddressTypeNotSupported(0x99);
        assert_eq!(format!("{}", err), "Address type not supported: 153");

        let err = SocksError::InvalidDomain("empty".to_string());
        assert_eq!(format!("{}", err), "Invalid domain name: empty");
    }

    #[test]
    fn test_server_error_from_io() {
        let err: ServerError = io::Error::new(io::ErrorKind::Other, "io error").into();
        assert!(matches!(err, ServerError::Io(_)));
    }
}
