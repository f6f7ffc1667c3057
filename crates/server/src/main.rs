//! offerscout server entry point.
//!
//! Boots either the HTTP route surface or the MCP server on stdio transport,
//! per the configured `transport`. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use offerscout_core::{AppConfig, Transport};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod routes;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let state = Arc::new(state::AppState::from_config(&config)?);

    match config.transport {
        Transport::Http => {
            tracing::info!("Starting offerscout on HTTP transport");
            routes::serve(&config.listen_addr, state).await?;
        }
        Transport::Stdio => {
            tracing::info!("Starting offerscout MCP server on stdio transport");
            let server = serve_server(handler::OfferscoutServer::new(state), stdio()).await?;
            server.waiting().await?;
        }
    }

    Ok(())
}
