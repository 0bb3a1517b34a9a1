//! SOCKS5 reply builder
//!
//! Constructs SOCKS5 reply messages.

use crate::error::{ReplyCode, SocksError};
use crate::socks::address::TargetAddr;
use crate::socks::consts::*;
use bytes::{BufMut, BytesMut};
use std::net::SocketAddr;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Build and send a SOCKS5 reply
///
/// # SOCKS5 Reply Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// # Arguments
///
/// * `stream` - The stream to write to
/// * `reply_code` - The reply status code
/// * `bind_addr` - The bound address (optional, defaults to 0.0.0.0:0)
pub async fn send_reply<S>(
    stream: &mut S,
    reply_code: ReplyCode,
    bind_addr: Option<SocketAddr>,
) -> Result<(), SocksError>
where
    S: AsyncWrite + Unpin + ?Sized,
{
    let bind_addr = bind_addr.map(TargetAddr::from).unwrap_or_default();

    let mut reply = BytesMut::with_capacity(22);
    reply.put_u8(SOCKS5_VERSION);
    reply.put_u8(reply_code.into());
    reply.put_u8(SOCKS5_RESERVED);
    bind_addr.write_to(&mut reply)?;

    stream.write_all(&reply).await?;
    stream.flush().await?;

    Ok(())
}

/// Send a success reply carrying the outbound socket's local address
pub async fn send_success<S>(stream: &mut S, bind_addr: SocketAddr) -> Result<(), SocksError>
where
    S: AsyncWrite + Unpin + ?Sized,
{
    send_reply(stream, ReplyCode::Succeeded, Some(bind_addr)).await
}

/// Send a failure reply with a zero IPv4 address
pub async fn send_failure<S>(stream: &mut S, reply_code: ReplyCode) -> Result<(), SocksError>
where
    S: AsyncWrite + Unpin + ?Sized,
{
    send_reply(stream, reply_code, None).await
}
