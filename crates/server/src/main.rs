//! revcache-mcp entry point.
//!
//! Boots the offline worker and exposes it as MCP tools on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use revcache_client::Worker;
use revcache_core::AppConfig;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let origin = config.origin_url()?;
    let manifest_path = config.require_manifest_path()?;

    tracing::info!(
        %origin,
        db_path = %config.db_path.display(),
        manifest_path = %manifest_path.display(),
        "starting revcache-mcp on stdio transport"
    );

    let worker = Worker::from_config(&config).await?;
    worker.install();
    if let Some(stats) = worker.activate().await {
        tracing::info!(purged = stats.purged, kept = stats.kept, "activation reconciled revision cache");
    }

    let handler = handler::RevcacheServer::new(Arc::new(worker), origin);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
