use anyhow::Result;
use clap::Parser;

use socks5_relay::{Args, Config, Server};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config: Config = Args::parse().into();
    let server = Server::bind(&config.listen_addr()).await?;
    server.run().await
}
