use std::time::Duration;

use bytes::Buf;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

use crate::error::{Result, Socks5Error};
use crate::protocol::{AddressType, Command, ParsedRequest, SOCKS_VERSION, ipv4_host, ipv6_host};
use crate::util::read_at_least;

/// 读取整个请求的时间上限, 从第一次读取开始计算
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// 最长请求 (域名 255 字节) 为 262 字节, 多留一个字节用来发现多余数据
const REQUEST_BUF_LEN: usize = 4 + 1 + 255 + 2 + 1;

// VER + CMD + RSV + ATYP + 地址的第一个字节
const REQUEST_MIN_LEN: usize = 5;

/// 处理请求
///
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  |   1   |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
///
/// 只支持 CONNECT。出错时不向客户端写任何响应。
pub async fn read_request<R>(client: &mut R) -> Result<ParsedRequest>
where
    R: AsyncRead + Unpin,
{
    match timeout(REQUEST_TIMEOUT, read_request_inner(client)).await {
        Ok(result) => result,
        Err(_) => Err(Socks5Error::Timeout(REQUEST_TIMEOUT)),
    }
}

async fn read_request_inner<R>(client: &mut R) -> Result<ParsedRequest>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; REQUEST_BUF_LEN];
    let n = read_at_least(client, &mut buf, REQUEST_MIN_LEN).await?;

    let version = buf[0];
    if version != SOCKS_VERSION {
        return Err(Socks5Error::Version(version));
    }

    let command = match Command::from_code(buf[1]) {
        Some(Command::Connect) => Command::Connect,
        _ => return Err(Socks5Error::UnsupportedCommand(buf[1])),
    };

    let reserved = buf[2];
    let address_type =
        AddressType::from_code(buf[3]).ok_or(Socks5Error::AddressType(buf[3]))?;

    let req_len = address_type.request_len(buf[4]);
    if n < req_len {
        client.read_exact(&mut buf[n..req_len]).await?;
    } else if n > req_len {
        return Err(Socks5Error::ExtraData {
            expected: req_len,
            actual: n,
        });
    }

    let (host, port) = decode_address(address_type, &buf[4..req_len])?;

    Ok(ParsedRequest {
        command,
        reserved,
        address_type,
        host,
        port,
    })
}

/// 解码 DST.ADDR 和 DST.PORT, `body` 从偏移 4 开始且长度恰好正确
fn decode_address(address_type: AddressType, mut body: &[u8]) -> Result<(String, u16)> {
    let host = match address_type {
        AddressType::Ipv4 => {
            let mut octets = [0u8; 4];
            body.copy_to_slice(&mut octets);
            ipv4_host(octets)
        }
        AddressType::Domain => {
            let len = body.get_u8() as usize;
            let host = std::str::from_utf8(&body[..len])
                .map_err(|_| Socks5Error::InvalidDomain)?
                .to_owned();
            body.advance(len);
            host
        }
        AddressType::Ipv6 => {
            let mut octets = [0u8; 16];
            body.copy_to_slice(&mut octets);
            ipv6_host(octets)
        }
    };
    let port = body.get_u16();
    Ok((host, port))
}
