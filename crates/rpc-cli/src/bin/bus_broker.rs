//! Standalone topic broker for the TCP bus.

use anyhow::{Context, Result};
use clap::Parser;
use message_bus::Broker;

#[derive(Parser, Debug)]
#[command(name = "bus-broker", about = "Topic broker for the bus-rpc TCP bus")]
struct Flags {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:1883")]
    listen: String,

    /// Require clients to authenticate with this username.
    #[arg(long, requires = "password")]
    username: Option<String>,

    /// Password matching --username.
    #[arg(long, requires = "username")]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    rpc_cli::telemetry::init_logging()?;
    let flags = Flags::parse();

    let credentials = match (flags.username, flags.password) {
        (Some(u), Some(p)) => Some((u, p)),
        _ => None,
    };
    let broker = Broker::bind(&flags.listen, credentials)
        .await
        .with_context(|| format!("failed to bind broker to {}", flags.listen))?;

    broker.run().await?;
    Ok(())
}
