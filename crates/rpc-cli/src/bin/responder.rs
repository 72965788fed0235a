//! RPC responder service.
//!
//! Serves the standard handlers on the request topic until a `quit` call
//! with `quit: true` is answered, then exits.

use anyhow::Result;
use clap::Parser;
use rpc_cli::flags::BusArgs;
use rpc_responder::{Dispatcher, HandlerRegistry, ShutdownSignal};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "responder", about = "Serves RPC calls published on the bus")]
struct Flags {
    #[command(flatten)]
    bus: BusArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    rpc_cli::telemetry::init_logging()?;
    let flags = Flags::parse();

    let transport = flags.bus.connect().await?;
    let registry = Arc::new(HandlerRegistry::with_default_handlers());
    let shutdown = ShutdownSignal::new();

    let dispatcher = Dispatcher::new(registry, transport, shutdown.clone());
    let request_topic = flags.bus.request_topic.clone();
    tokio::spawn(async move {
        if let Err(e) = dispatcher.serve(&request_topic).await {
            error!(error = %e, "Dispatcher stopped");
        }
    });

    info!(request_topic = %flags.bus.request_topic, "Responder running");
    tokio::select! {
        () = shutdown.wait() => info!("Quit requested, exiting"),
        _ = tokio::signal::ctrl_c() => info!("Interrupted, exiting"),
    }
    Ok(())
}
