//! 最小的 SOCKS5 代理: 只支持无认证和 CONNECT 命令
//!
//! 每个连接依次经过握手、请求解析、连接目标和双向转发。
//! 任何错误都只会关闭对应的连接, 不发送 SOCKS 失败响应。

pub mod config;
pub mod dump;
pub mod error;
pub mod handshake;
pub mod protocol;
pub mod relay;
pub mod request;
pub mod server;
mod util;

pub use config::{Args, Config};
pub use error::{Result, Socks5Error};
pub use protocol::{AddressType, Command, ParsedRequest};
pub use server::{ConnectionContext, Server};
