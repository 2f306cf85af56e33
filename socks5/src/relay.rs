use std::fmt;

use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;

use crate::error::Result;
use crate::protocol::SUCCESS_REPLY;

/// 每个方向使用的固定大小缓冲区
pub const RELAY_BUF_LEN: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToUpstream,
    UpstreamToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToUpstream => f.write_str("客户端到目标"),
            Direction::UpstreamToClient => f.write_str("目标到客户端"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    /// 先结束的方向
    pub first_closed: Direction,
    pub client_to_upstream: u64,
    pub upstream_to_client: u64,
}

/// 发送成功响应, 然后在客户端和目标之间双向转发数据
///
/// 任一方向结束 (EOF 或错误) 都会关闭它的写入端并通知另一方向。
/// 另一方向写完手上的数据后不再读取, 随即结束。两个方向都结束后返回。
pub async fn relay<C, U>(mut client: C, upstream: U) -> Result<RelayStats>
where
    C: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    client.write_all(&SUCCESS_REPLY).await?;

    let (mut client_read, mut client_write) = tokio::io::split(client);
    let (mut upstream_read, mut upstream_write) = tokio::io::split(upstream);

    // 每个方向结束时丢弃自己的 Sender, 对方的 Receiver 随即就绪
    let (c2u_done, c2u_closed) = oneshot::channel::<()>();
    let (u2c_done, u2c_closed) = oneshot::channel::<()>();

    let (c2u, u2c) = tokio::join!(
        copy_half(&mut client_read, &mut upstream_write, u2c_closed, c2u_done),
        copy_half(&mut upstream_read, &mut client_write, c2u_closed, u2c_done),
    );

    let first_closed = if c2u.stopped_by_peer {
        Direction::UpstreamToClient
    } else {
        Direction::ClientToUpstream
    };

    Ok(RelayStats {
        first_closed,
        client_to_upstream: c2u.copied,
        upstream_to_client: u2c.copied,
    })
}

struct HalfOutcome {
    copied: u64,
    /// 因为另一方向先结束而停止
    stopped_by_peer: bool,
}

async fn copy_half<R, W>(
    src: &mut R,
    dst: &mut W,
    mut peer_closed: oneshot::Receiver<()>,
    done: oneshot::Sender<()>,
) -> HalfOutcome
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = [0u8; RELAY_BUF_LEN];
    let mut copied = 0u64;
    let mut stopped_by_peer = false;

    loop {
        // 只在等待读取时响应对方结束, 已读到的数据总是完整写出
        let n = tokio::select! {
            r = src.read(&mut buf) => match r {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!("读取失败: {}", e);
                    break;
                }
            },
            _ = &mut peer_closed => {
                stopped_by_peer = true;
                break;
            }
        };
        if let Err(e) = dst.write_all(&buf[..n]).await {
            debug!("写入失败: {}", e);
            break;
        }
        copied += n as u64;
    }

    let _ = dst.shutdown().await;
    drop(done);

    HalfOutcome {
        copied,
        stopped_by_peer,
    }
}
