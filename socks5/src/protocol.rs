use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

pub const SOCKS_VERSION: u8 = 0x05;
pub const NO_AUTHENTICATION: u8 = 0x00;

pub const CONNECT_COMMAND: u8 = 0x01;
pub const BIND_COMMAND: u8 = 0x02;
pub const UDP_ASSOCIATE_COMMAND: u8 = 0x03;

pub const IPV4_ADDRESS: u8 = 0x01;
pub const DOMAIN_NAME: u8 = 0x03;
pub const IPV6_ADDRESS: u8 = 0x04;

/// 连接目标成功后发送给客户端的响应
/// 绑定地址 (0.0.0.0) 和端口 (2115) 是固定占位值, 不是真实的本地地址
pub const SUCCESS_REPLY: [u8; 10] = [
    // 版本
    SOCKS_VERSION,
    // 状态码 (成功)
    0x00,
    // 保留字段
    0x00,
    // 地址类型 (IPv4)
    IPV4_ADDRESS,
    // IP地址 (0.0.0.0)
    0x00,
    0x00,
    0x00,
    0x00,
    // 端口 (2115)
    0x08,
    0x43,
];

/// 握手响应: 总是选择无认证
pub const HANDSHAKE_REPLY: [u8; 2] = [SOCKS_VERSION, NO_AUTHENTICATION];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Bind,
    UdpAssociate,
}

impl Command {
    pub fn from_code(code: u8) -> Option<Command> {
        match code {
            CONNECT_COMMAND => Some(Command::Connect),
            BIND_COMMAND => Some(Command::Bind),
            UDP_ASSOCIATE_COMMAND => Some(Command::UdpAssociate),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Command::Connect => CONNECT_COMMAND,
            Command::Bind => BIND_COMMAND,
            Command::UdpAssociate => UDP_ASSOCIATE_COMMAND,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    Ipv4,
    Domain,
    Ipv6,
}

impl AddressType {
    pub fn from_code(code: u8) -> Option<AddressType> {
        match code {
            IPV4_ADDRESS => Some(AddressType::Ipv4),
            DOMAIN_NAME => Some(AddressType::Domain),
            IPV6_ADDRESS => Some(AddressType::Ipv6),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            AddressType::Ipv4 => IPV4_ADDRESS,
            AddressType::Domain => DOMAIN_NAME,
            AddressType::Ipv6 => IPV6_ADDRESS,
        }
    }

    /// 请求总长度 (VER 到 DST.PORT)
    /// `domain_len` 是偏移 4 处的长度字节, 仅对域名有意义
    pub fn request_len(self, domain_len: u8) -> usize {
        match self {
            AddressType::Ipv4 => 4 + 4 + 2,
            AddressType::Domain => 4 + 1 + domain_len as usize + 2,
            AddressType::Ipv6 => 4 + 16 + 2,
        }
    }
}

/// 解析后的 CONNECT 请求, 只会为 `Command::Connect` 构造
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub command: Command,
    /// RSV 原值, 只用于诊断输出
    pub reserved: u8,
    pub address_type: AddressType,
    pub host: String,
    pub port: u16,
}

impl ParsedRequest {
    /// 拨号用的 `host:port`, IPv6 地址加方括号
    pub fn dial_addr(&self) -> String {
        join_host_port(&self.host, self.port)
    }
}

impl fmt::Display for ParsedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dial_addr())
    }
}

pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

pub fn ipv4_host(octets: [u8; 4]) -> String {
    Ipv4Addr::from(octets).to_string()
}

pub fn ipv6_host(octets: [u8; 16]) -> String {
    Ipv6Addr::from(octets).to_string()
}
