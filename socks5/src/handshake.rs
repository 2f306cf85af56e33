use bytes::Bytes;
use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, Socks5Error};
use crate::protocol::{HANDSHAKE_REPLY, SOCKS_VERSION};
use crate::util::read_at_least;

// VER(1) + NMETHODS(1) + METHODS(1..255)
const HANDSHAKE_BUF_LEN: usize = 2 + 255;

/// 处理握手
///
/// +----+----------+----------+
/// |VER | NMETHODS | METHODS  |
/// +----+----------+----------+
/// | 1  |    1     |  1~255   |
/// +----+----------+----------+
///
/// 不检查客户端提供的认证方法, 版本为 5 时总是回复 `05 00` (无认证)。
/// 版本错误时不写任何响应。
///
/// 第一次读取可能已经包含了后续请求的数据, 这部分数据原样返回,
/// 由调用方交给请求解析。
pub async fn negotiate<S>(client: &mut S) -> Result<Bytes>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; HANDSHAKE_BUF_LEN];
    let n = read_at_least(client, &mut buf, 2).await?;

    let version = buf[0];
    if version != SOCKS_VERSION {
        return Err(Socks5Error::Version(version));
    }

    let nmethods = buf[1] as usize;
    let msg_len = 2 + nmethods;
    let surplus = if n < msg_len {
        client.read_exact(&mut buf[n..msg_len]).await?;
        Bytes::new()
    } else {
        Bytes::copy_from_slice(&buf[msg_len..n])
    };

    debug!("客户端提供 {} 种认证方法: {:?}", nmethods, &buf[2..msg_len]);

    client.write_all(&HANDSHAKE_REPLY).await?;
    Ok(surplus)
}
