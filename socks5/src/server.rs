use std::any::Any;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;

use anyhow::{Context, Result as AnyResult};
use futures_util::FutureExt;
use log::{error, info};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use uuid::Uuid;

use crate::dump::RequestTable;
use crate::error::{Result, Socks5Error};
use crate::handshake::negotiate;
use crate::relay::{RelayStats, relay};
use crate::request::read_request;

/// 每个连接的日志上下文, 由连接任务持有并附加到该连接的所有日志
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub id: Uuid,
    pub peer: SocketAddr,
}

impl ConnectionContext {
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer,
        }
    }
}

impl fmt::Display for ConnectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}]", &self.id.simple().to_string()[..8], self.peer)
    }
}

pub struct Server {
    listener: TcpListener,
}

impl Server {
    pub async fn bind(addr: &str) -> AnyResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("无法监听 {}", addr))?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// 接受连接并为每个连接启动一个任务, 不会因为单个连接出错而退出
    pub async fn run(self) -> AnyResult<()> {
        info!("socks5 代理启动在 {}", self.local_addr()?);

        loop {
            match self.listener.accept().await {
                Ok((socket, peer)) => {
                    let ctx = ConnectionContext::new(peer);
                    info!("{} 新连接", ctx);
                    tokio::spawn(serve_connection(ctx, socket));
                }
                Err(e) => {
                    error!("接受连接时出错: {}", e);
                }
            }
        }
    }
}

/// 连接任务的入口: 处理整个连接, 并把任何错误或 panic 转换为日志
pub async fn serve_connection<S>(ctx: ConnectionContext, client: S)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match AssertUnwindSafe(handle_connection(&ctx, client))
        .catch_unwind()
        .await
    {
        Ok(Ok(stats)) => info!(
            "{} 连接结束, {}先关闭, 上行 {} 字节, 下行 {} 字节",
            ctx, stats.first_closed, stats.client_to_upstream, stats.upstream_to_client
        ),
        Ok(Err(e)) => error!("{} 处理连接时出错: {}", ctx, e),
        Err(panic) => error!("{} 连接任务异常退出: {}", ctx, panic_message(&*panic)),
    }
}

/// 握手 -> 解析请求 -> 连接目标 -> 转发
///
/// 出错时直接返回, `client` 随之被关闭, 不发送 SOCKS 失败响应。
pub async fn handle_connection<S>(ctx: &ConnectionContext, mut client: S) -> Result<RelayStats>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let surplus = negotiate(&mut client).await?;

    // 握手时多读到的数据先于连接上的后续数据交给请求解析
    let request = read_request(&mut (&surplus[..]).chain(&mut client)).await?;
    info!("{} 请求:\n{}", ctx, RequestTable::new(&request));

    let target_addr = request.dial_addr();
    let upstream = dial(&target_addr).await?;
    info!("{} 成功连接到目标服务器: {}", ctx, target_addr);

    relay(client, upstream).await
}

/// 连接目标地址, `addr` 为 `host:port`
pub async fn dial(addr: &str) -> Result<TcpStream> {
    TcpStream::connect(addr)
        .await
        .map_err(|source| Socks5Error::Dial {
            addr: addr.to_string(),
            source,
        })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    fn test_ctx() -> ConnectionContext {
        ConnectionContext::new("127.0.0.1:50000".parse().unwrap())
    }

    #[test]
    fn context_display_is_short_id_and_peer() {
        let ctx = test_ctx();
        let shown = ctx.to_string();
        assert!(shown.starts_with('['));
        assert!(shown.ends_with(" 127.0.0.1:50000]"));
        assert_eq!(shown.len(), 1 + 8 + 1 + "127.0.0.1:50000".len() + 1);
    }

    #[tokio::test]
    async fn dial_failure_is_reported_with_address() {
        // 先占用一个端口再释放, 保证没有监听者
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = dial(&addr).await.unwrap_err();
        match err {
            Socks5Error::Dial { addr: a, .. } => assert_eq!(a, addr),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn dial_failure_closes_client_without_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (mut app, client_side) = tokio::io::duplex(1024);
        let task = tokio::spawn(async move {
            let ctx = test_ctx();
            handle_connection(&ctx, client_side).await
        });

        app.write_all(&[5, 1, 0]).await.unwrap();
        let mut reply = [0u8; 2];
        app.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [5, 0]);

        let mut req = vec![5, 1, 0, 1, 127, 0, 0, 1];
        req.extend_from_slice(&port.to_be_bytes());
        app.write_all(&req).await.unwrap();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, Socks5Error::Dial { .. }));

        let mut rest = Vec::new();
        app.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn greeting_and_request_in_one_write_are_both_handled() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (mut app, client_side) = tokio::io::duplex(1024);
        let mut pipelined = vec![5, 1, 0, 5, 1, 0, 1, 127, 0, 0, 1];
        pipelined.extend_from_slice(&port.to_be_bytes());
        app.write_all(&pipelined).await.unwrap();

        let ctx = test_ctx();
        let err = handle_connection(&ctx, client_side).await.unwrap_err();
        // 请求被完整解析, 失败发生在连接目标时
        match err {
            Socks5Error::Dial { addr, .. } => assert_eq!(addr, format!("127.0.0.1:{}", port)),
            other => panic!("unexpected error: {}", other),
        }

        let mut received = Vec::new();
        app.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, [5, 0]);
    }

    #[tokio::test]
    async fn unsupported_command_closes_client_without_reply() {
        let (mut app, client_side) = tokio::io::duplex(1024);
        let task = tokio::spawn(async move {
            let ctx = test_ctx();
            handle_connection(&ctx, client_side).await
        });

        app.write_all(&[5, 1, 0]).await.unwrap();
        let mut reply = [0u8; 2];
        app.read_exact(&mut reply).await.unwrap();

        app.write_all(&[5, 3, 0, 1, 127, 0, 0, 1, 0, 53]).await.unwrap();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, Socks5Error::UnsupportedCommand(3)));

        let mut rest = Vec::new();
        app.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn serve_connection_swallows_errors() {
        let (mut app, client_side) = tokio::io::duplex(1024);
        app.write_all(&[4, 1, 0]).await.unwrap();

        serve_connection(test_ctx(), client_side).await;

        let mut rest = Vec::new();
        app.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }
}
