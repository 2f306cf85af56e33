use clap::Parser;

use crate::protocol::join_host_port;

pub const DEFAULT_PORT: u16 = 1080;

#[derive(Parser, Debug)]
#[command(name = "socks5-relay")]
#[command(about = "Minimal SOCKS5 CONNECT relay")]
#[command(version)]
pub struct Args {
    /// Listen host
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    pub host: String,

    /// Listen port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

#[derive(Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn listen_addr(&self) -> String {
        join_host_port(&self.host, self.port)
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            host: args.host,
            port: args.port,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_listen_on_all_interfaces_port_1080() {
        let config: Config = Args::try_parse_from(["socks5-relay"]).unwrap().into();
        assert_eq!(config.listen_addr(), "0.0.0.0:1080");
    }

    #[test]
    fn host_and_port_flags() {
        let config: Config = Args::try_parse_from(["socks5-relay", "-H", "127.0.0.1", "-p", "9050"])
            .unwrap()
            .into();
        assert_eq!(config.listen_addr(), "127.0.0.1:9050");

        let config: Config = Args::try_parse_from(["socks5-relay", "--host", "::1", "--port", "1081"])
            .unwrap()
            .into();
        assert_eq!(config.listen_addr(), "[::1]:1081");
    }

    #[test]
    fn version_flag_is_recognised() {
        let err = Args::try_parse_from(["socks5-relay", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn port_out_of_range_is_rejected() {
        assert!(Args::try_parse_from(["socks5-relay", "-p", "70000"]).is_err());
    }
}
