use std::io;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Socks5Error>;

/// 单个 SOCKS5 连接处理过程中的错误
///
/// 所有错误都会终止所属连接，且不会转换为 SOCKS 失败响应，
/// 客户端只会看到连接被关闭。
#[derive(Error, Debug)]
pub enum Socks5Error {
    /// 客户端声明的协议版本不是 5
    #[error("不支持的SOCKS版本: {0}")]
    Version(u8),

    /// ATYP 不是 IPv4、域名或 IPv6
    #[error("不支持的地址类型: {0}")]
    AddressType(u8),

    /// BIND、UDP ASSOCIATE 或未知命令
    #[error("不支持的命令: {0}")]
    UnsupportedCommand(u8),

    /// 请求之后还跟着多余的数据
    #[error("请求收到多余数据: 期望 {expected} 字节, 实际 {actual} 字节")]
    ExtraData {
        expected: usize,
        actual: usize,
    },

    #[error("域名不是有效的 UTF-8")]
    InvalidDomain,

    #[error("在 {0:?} 内未收到完整请求")]
    Timeout(Duration),

    #[error("连接目标服务器失败: {addr} - {source}")]
    Dial {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("IO 错误: {0}")]
    Io(#[from] io::Error),
}
