//! SOCKS5 address codec
//!
//! Encodes and decodes the `ATYP | ADDR | PORT` triple shared by requests
//! and replies.

use super::consts::*;
use crate::error::SocksError;
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Kind of address carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// 4-byte IPv4 address
    Ipv4,
    /// 16-byte IPv6 address
    Ipv6,
    /// Length-prefixed domain name
    DomainName,
}

impl AddressKind {
    /// Parse an ATYP byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_ADDR_TYPE_IPV4 => Some(AddressKind::Ipv4),
            SOCKS5_ADDR_TYPE_DOMAIN => Some(AddressKind::DomainName),
            SOCKS5_ADDR_TYPE_IPV6 => Some(AddressKind::Ipv6),
            _ => None,
        }
    }

    /// ATYP byte for this kind
    pub fn to_byte(self) -> u8 {
        match self {
            AddressKind::Ipv4 => SOCKS5_ADDR_TYPE_IPV4,
            AddressKind::DomainName => SOCKS5_ADDR_TYPE_DOMAIN,
            AddressKind::Ipv6 => SOCKS5_ADDR_TYPE_IPV6,
        }
    }
}

/// Target address for SOCKS5 requests
///
/// Represents the destination address in a SOCKS5 request.
/// Can be an IP address (v4 or v6) or a domain name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
    /// IP address with port
    Ip(SocketAddr),
    /// Domain name with port
    Domain(String, u16),
}

impl TargetAddr {
    /// Create a new TargetAddr from an IPv4 address and port
    pub fn ipv4(ip: Ipv4Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V4(ip), port))
    }

    /// Create a new TargetAddr from an IPv6 address and port
    pub fn ipv6(ip: Ipv6Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V6(ip), port))
    }

    /// Create a new TargetAddr from a domain name and port
    pub fn domain(domain: impl Into<String>, port: u16) -> Self {
        TargetAddr::Domain(domain.into(), port)
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        match self {
            TargetAddr::Ip(addr) => addr.port(),
            TargetAddr::Domain(_, port) => *port,
        }
    }

    /// Wire kind of this address
    pub fn kind(&self) -> AddressKind {
        match self {
            TargetAddr::Ip(SocketAddr::V4(_)) => AddressKind::Ipv4,
            TargetAddr::Ip(SocketAddr::V6(_)) => AddressKind::Ipv6,
            TargetAddr::Domain(_, _) => AddressKind::DomainName,
        }
    }

    /// Read `ATYP | ADDR | PORT` from the stream
    pub async fn read_from<R>(reader: &mut R) -> Result<Self, SocksError>
    where
        R: AsyncRead + Unpin,
    {
        let atyp = reader.read_u8().await?;
        Self::read_with_type(reader, atyp).await
    }

    /// Read `ADDR | PORT` once the ATYP byte has already been consumed
    ///
    /// Consumes exactly 4, 16 or `1 + len` address bytes followed by the
    /// big-endian port.
    pub async fn read_with_type<R>(reader: &mut R, atyp: u8) -> Result<Self, SocksError>
    where
        R: AsyncRead + Unpin,
    {
        let kind = AddressKind::from_byte(atyp).ok_or(SocksError::AddressTypeNotSupported(atyp))?;

        match kind {
            AddressKind::Ipv4 => {
                let mut addr = [0u8; 4];
                reader.read_exact(&mut addr).await?;
                let port = reader.read_u16().await?;
                Ok(TargetAddr::ipv4(Ipv4Addr::from(addr), port))
            }
            AddressKind::Ipv6 => {
                let mut addr = [0u8; 16];
                reader.read_exact(&mut addr).await?;
                let port = reader.read_u16().await?;
                Ok(TargetAddr::ipv6(Ipv6Addr::from(addr), port))
            }
            AddressKind::DomainName => {
                let len = reader.read_u8().await? as usize;
                let mut domain = vec![0u8; len];
                reader.read_exact(&mut domain).await?;
                let port = reader.read_u16().await?;

                if len == 0 {
                    return Err(SocksError::InvalidDomain("empty domain name".to_string()));
                }
                let domain = String::from_utf8(domain)
                    .map_err(|_| SocksError::InvalidDomain("domain is not valid UTF-8".to_string()))?;

                Ok(TargetAddr::Domain(domain, port))
            }
        }
    }

    /// Append `ATYP | ADDR | PORT` to the buffer
    pub fn write_to(&self, buf: &mut BytesMut) -> Result<(), SocksError> {
        match self {
            TargetAddr::Ip(SocketAddr::V4(addr)) => {
                buf.put_u8(SOCKS5_ADDR_TYPE_IPV4);
                buf.put_slice(&addr.ip().octets());
                buf.put_u16(addr.port());
            }
            TargetAddr::Ip(SocketAddr::V6(addr)) => {
                buf.put_u8(SOCKS5_ADDR_TYPE_IPV6);
                buf.put_slice(&addr.ip().octets());
                buf.put_u16(addr.port());
            }
            TargetAddr::Domain(domain, port) => {
                if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
                    return Err(SocksError::InvalidDomain(format!(
                        "domain length {} outside 1..={}",
                        domain.len(),
                        MAX_DOMAIN_LEN
                    )));
                }
                buf.put_u8(SOCKS5_ADDR_TYPE_DOMAIN);
                buf.put_u8(domain.len() as u8);
                buf.put_slice(domain.as_bytes());
                buf.put_u16(*port);
            }
        }
        Ok(())
    }

    /// Serialize the address to bytes for SOCKS5 protocol
    pub fn to_bytes(&self) -> Result<Vec<u8>, SocksError> {
        let mut buf = BytesMut::with_capacity(1 + 1 + MAX_DOMAIN_LEN + 2);
        self.write_to(&mut buf)?;
        Ok(buf.to_vec())
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ip(addr) => write!(f, "{}", addr),
            TargetAddr::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}

impl From<SocketAddr> for TargetAddr {
    fn from(addr: SocketAddr) -> Self {
        // An IPv4-mapped IPv6 socket is reported with the IPv4 convention
        TargetAddr::Ip(SocketAddr::new(addr.ip().to_canonical(), addr.port()))
    }
}

impl Default for TargetAddr {
    fn default() -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0))
    }
}
