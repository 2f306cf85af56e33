use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

/// 读取至少 `min` 个字节到 `buf`, 返回实际读取的字节数 (可能多于 `min`)
///
/// 在读够 `min` 字节之前遇到 EOF 返回 `UnexpectedEof`。
pub async fn read_at_least<R>(reader: &mut R, buf: &mut [u8], min: usize) -> io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    debug_assert!(min <= buf.len());

    let mut n = 0;
    while n < min {
        match reader.read(&mut buf[n..]).await? {
            0 => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("连接在读取 {} 字节前关闭, 仅收到 {} 字节", min, n),
                ));
            }
            read => n += read,
        }
    }
    Ok(n)
}
