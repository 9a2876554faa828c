//! Ad Copy MCP Server
//!
//! Serves the `create_ad_copy` tool over stdio. Configuration is read from the same
//! environment as the HTTP service (storage backend, provider keys, public base URL).

use adcopy_core::Config;
use adcopy_mcp::AdCopyService;
use adcopy_processing::AdCopyPipeline;
use anyhow::Context;
use rmcp::service::ServiceExt;
use rmcp::transport::io::stdio;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adcopy=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    let gateway = adcopy_storage::create_gateway(&config)
        .await
        .context("Failed to initialize storage")?;
    let pipeline = AdCopyPipeline::from_config(&config, gateway)?;

    let service = AdCopyService::new(pipeline);
    let running = service.serve(stdio()).await.context("MCP transport failed")?;
    running.waiting().await.context("MCP server error")?;

    Ok(())
}
