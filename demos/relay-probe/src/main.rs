//! Connects to a relay, runs a few commands, and prints every message
//! as one JSON line.
//!
//! ```text
//! RUST_LOG=weerelay=debug relay-probe 127.0.0.1:9000 --password secret --hdata
//! ```

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use weerelay::prelude::*;

#[derive(Parser)]
#[command(name = "relay-probe")]
#[command(about = "Probe a WeeChat relay and dump its replies as JSON")]
struct Cli {
    /// Relay address as host:port.
    #[arg(default_value = weerelay::DEFAULT_ADDRESS)]
    address: String,

    /// Relay password.
    #[arg(long, default_value = "")]
    password: String,

    /// Ask for uncompressed frames.
    #[arg(long)]
    no_compression: bool,

    /// List buffers first, one JSON object per buffer.
    #[arg(long)]
    hdata: bool,

    /// Seconds to wait for each frame.
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "probe failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let mut client = RelayClient::builder()
        .address(&cli.address)
        .password(&cli.password)
        .compression(!cli.no_compression)
        .read_timeout(Duration::from_secs(cli.timeout))
        .connect()
        .await?;

    if cli.hdata {
        for buffer in client.list_buffers().await? {
            match serde_json::to_string(&buffer) {
                Ok(line) => println!("{line}"),
                Err(e) => {
                    tracing::warn!(error = %e, buffer = buffer.canonical_name(), "unprintable buffer")
                }
            }
        }
    }
    client.info("version", "version").await?;
    client.test().await?;
    // The relay answers in order, so the pong marks the end of our replies.
    client.ping(Some("probe-done")).await?;

    while let Some(next) = client.recv().await {
        let msg = next?;
        match serde_json::to_string(&msg) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, identifier = %msg.identifier, "unprintable message"),
        }
        if msg.identifier == "_pong" {
            break;
        }
    }

    client.quit().await
}
