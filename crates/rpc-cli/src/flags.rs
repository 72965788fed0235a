//! Command-line flags shared by the binaries.

use anyhow::{Context, Result};
use clap::Args;
use message_bus::TcpBus;
use std::sync::Arc;
use std::time::Duration;

/// How long a binary waits for the broker connection before giving up.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection flags common to the requester and responder.
#[derive(Args, Debug)]
pub struct BusArgs {
    /// Broker address.
    #[arg(long, default_value = "tcp://127.0.0.1:1883")]
    pub server: String,

    /// Topic the responder listens on and the requester publishes to.
    #[arg(long, default_value = "request")]
    pub request_topic: String,

    /// Broker username; must be given together with --password.
    #[arg(long, requires = "password")]
    pub username: Option<String>,

    /// Broker password.
    #[arg(long, requires = "username")]
    pub password: Option<String>,
}

impl BusArgs {
    fn credentials(&self) -> Option<(String, String)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => Some((u.clone(), p.clone())),
            _ => None,
        }
    }

    /// Connect to the broker these flags point at.
    pub async fn connect(&self) -> Result<Arc<TcpBus>> {
        let bus = TcpBus::connect(&self.server, self.credentials(), CONNECT_TIMEOUT)
            .await
            .with_context(|| format!("failed to connect to bus at {}", self.server))?;
        Ok(Arc::new(bus))
    }
}
