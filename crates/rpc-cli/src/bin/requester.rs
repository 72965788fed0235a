//! One-shot RPC requester.
//!
//! Issues a single call, prints the result, and exits non-zero when the
//! responder reported a failure.

use anyhow::Result;
use clap::{Parser, Subcommand};
use rpc_cli::flags::BusArgs;
use rpc_core::{BuildInfo, Response};
use rpc_requester::Requester;
use std::time::Duration;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "requester", about = "Issues RPC calls over the bus")]
struct Flags {
    #[command(flatten)]
    bus: BusArgs,

    /// How long to wait for a reply.
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    #[command(subcommand)]
    call: Call,
}

#[derive(Subcommand, Debug)]
enum Call {
    /// Integer arithmetic on two parameters.
    Calculator {
        /// One of add, sub, mul, div.
        #[arg(long)]
        operation: String,
        #[arg(long)]
        param1: i64,
        #[arg(long)]
        param2: i64,
    },
    /// Fetch the responder's page list.
    GetPages,
    /// Fetch the responder's build metadata.
    BuildInfo,
    /// Ask the responder to shut down.
    Quit {
        /// The responder only quits when this is true.
        #[arg(long)]
        value: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    rpc_cli::telemetry::init_logging()?;
    let flags = Flags::parse();
    let timeout = Duration::from_secs(flags.timeout_secs);

    let transport = flags.bus.connect().await?;
    // Each invocation gets its own reply topic so concurrent requesters
    // against the same broker never see each other's replies.
    let client_id = format!("cli-{}", Uuid::now_v7());
    let requester = Requester::connect(transport, &flags.bus.request_topic, &client_id).await?;

    let response = match &flags.call {
        Call::Calculator {
            operation,
            param1,
            param2,
        } => {
            requester
                .calculator(operation, *param1, *param2, timeout)
                .await?
        }
        Call::GetPages => requester.get_pages(timeout).await?,
        Call::BuildInfo => requester.build_info(timeout).await?,
        Call::Quit { value } => requester.quit(*value, timeout).await?,
    };

    if !response.ok() {
        let code = response.code().unwrap_or(0);
        let message = response.message().unwrap_or("(no message)");
        eprintln!("call failed: code={code} message={message}");
        std::process::exit(1);
    }
    print_result(&flags.call, &response);
    Ok(())
}

fn print_result(call: &Call, response: &Response) {
    match call {
        Call::Calculator { .. } => match response.get_integer("result") {
            Ok(result) => println!("{result}"),
            Err(e) => println!("malformed reply: {e}"),
        },
        Call::GetPages => match response.get_string("result") {
            Ok(pages) => println!("{pages}"),
            Err(e) => println!("malformed reply: {e}"),
        },
        Call::BuildInfo => match BuildInfo::from_response(response) {
            Ok(info) => {
                println!("version:    {}", info.version);
                println!("build date: {}", info.build_date);
                println!("git commit: {}", info.git_commit);
                println!("git branch: {}", info.git_branch);
                println!("git url:    {}", info.git_url);
            }
            Err(e) => println!("malformed reply: {e}"),
        },
        Call::Quit { .. } => println!("ok"),
    }
}
