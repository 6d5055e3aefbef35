//! MyBank server entry point.

use clap::Parser;
use mybank_server::{App, Args};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,mybank=debug")),
        )
        .json()
        .init();

    let args = Args::parse();
    info!(db_url = %args.db_url, issuer = %args.token_issuer, "starting mybank");

    let _app = App::start(&args).await?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            shutdown.cancel();
        }
    });

    info!("services ready");
    shutdown.cancelled().await;
    info!("mybank stopped");
    Ok(())
}
