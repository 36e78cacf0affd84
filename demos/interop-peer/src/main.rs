//! Runs both ends of the conformance harness over TCP
//!
//!   interop-peer serve --listen 127.0.0.1:0
//!   interop-peer check

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use interop::{ConformanceClient, EchoServer, ObjectAdapter, Peer, PeerBuilder, Probe};
use tokio::{select, signal::ctrl_c};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset or empty
const DEFAULT_LOG_DIRECTIVES: &str = "interop=info";

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// File the server address is published to and read from
    #[arg(long, global = true, env = "INTEROP_ADDRESS_FILE")]
    address_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Host an echo server and publish its address
    Serve {
        #[arg(long, default_value = "127.0.0.1:0")]
        listen: SocketAddr,
    },
    /// Run the conformance checks against a published echo server
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .init();

    let args = Args::parse();
    let mut builder = PeerBuilder::from_env();
    if let Some(address_file) = args.address_file {
        builder = builder.address_file(address_file);
    }

    match args.command {
        Command::Serve { listen } => serve(builder, listen).await,
        Command::Check => check(&builder).await,
    }
}

fn log_filter(directives: Option<&str>) -> EnvFilter {
    match directives {
        Some(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(DEFAULT_LOG_DIRECTIVES),
    }
}

async fn serve(builder: PeerBuilder, listen: SocketAddr) -> anyhow::Result<()> {
    let adapter = Arc::new(ObjectAdapter::new());
    let echo = Arc::new(EchoServer::new());
    let probe = adapter.activate(Arc::new(Probe::new(Arc::clone(echo.state()))));
    echo.store_object(Some(probe));
    let object = adapter.activate(echo);

    let acceptor = builder
        .bind(listen, adapter)
        .await
        .with_context(|| format!("bind {listen}"))?;
    acceptor
        .publish(object)
        .await
        .context("publish server address")?;

    select! {
        result = acceptor.run() => result.context("accept connection"),
        result = ctrl_c() => {
            info!("shutting down");
            result.context("wait for ctrl-c")
        }
    }
}

async fn check(builder: &PeerBuilder) -> anyhow::Result<()> {
    let adapter = Arc::new(ObjectAdapter::new());
    let (peer, server) = builder
        .connect_from_file(Arc::clone(&adapter))
        .await
        .with_context(|| format!("connect to {}", builder.get_address_file().display()))?;

    let mut client = ConformanceClient::new(Peer::clone(&peer), server, &adapter);
    let result = client.run_all().await;
    peer.close().await;

    for verified in result?.verified {
        println!("ok {} {}", verified.step, verified.description);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::log_filter;

    #[test]
    fn log_filter_defaults_to_info() {
        assert_eq!(log_filter(None).to_string(), "interop=info");
        assert_eq!(log_filter(Some("")).to_string(), "interop=info");
    }

    #[test]
    fn log_filter_keeps_user_directives() {
        assert_eq!(log_filter(Some("interop=debug")).to_string(), "interop=debug");
        assert_eq!(log_filter(Some("warn")).to_string(), "warn");
    }
}
