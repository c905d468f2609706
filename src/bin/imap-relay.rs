#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! HTTP-to-IMAP relay server

use anyhow::Context;
use clap::Parser;
use imap_relay::http::{AppState, Authenticator, router};
use imap_relay::{ImapRelay, RelayConfig, ResolveOptions};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imap-relay")]
#[command(about = "Stateless HTTP relay that fetches and normalizes IMAP messages")]
struct Args {
    /// Address to listen on (overrides RELAY_BIND)
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = RelayConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    let relay = ImapRelay::new(ResolveOptions::from(&config));
    let state = AppState::new(relay, Authenticator::new(config.api_key.clone()));

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(
        "Relay listening on {} (part timeout: {:?}, fallback part: {})",
        config.bind, config.part_timeout, config.fallback_part
    );

    axum::serve(listener, router(state)).await?;
    Ok(())
}
