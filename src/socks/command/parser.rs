//! SOCKS5 request parser
//!
//! Parses SOCKS5 command requests from the client.

use crate::error::SocksError;
use crate::socks::address::TargetAddr;
use crate::socks::consts::*;
use crate::socks::types::{SocksCommand, SocksRequest};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

/// Parse a SOCKS5 request from the stream
///
/// # SOCKS5 Request Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// The destination is decoded before the command is checked, so an unknown
/// command is only reported once the whole request has been consumed.
pub async fn read_request<S>(stream: &mut S) -> Result<SocksRequest, SocksError>
where
    S: AsyncRead + Unpin,
{
    // Read: VER CMD RSV
    let mut header = [0u8; 3];
    stream.read_exact(&mut header).await?;

    let version = header[0];
    let cmd_byte = header[1];
    let reserved = header[2];

    if version != SOCKS5_VERSION {
        return Err(SocksError::MalformedRequest(format!(
            "Unsupported SOCKS version in request: {}",
            version
        )));
    }
    if reserved != SOCKS5_RESERVED {
        return Err(SocksError::MalformedRequest(format!(
            "Non-zero reserved byte: {}",
            reserved
        )));
    }

    let target = TargetAddr::read_from(stream).await?;

    let command =
        SocksCommand::from_byte(cmd_byte).ok_or(SocksError::CommandNotSupported(cmd_byte))?;

    debug!("Parsed SOCKS5 request: {} to {}", command, target);

    Ok(SocksRequest { command, target })
}
