mod config;
mod content;
mod error;
mod extractor;
mod http;
mod orchestrator;
mod server;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use advisor_common::openai::OpenAiClient;
use advisor_common::webhook::sink_from_url;

use config::Config;
use content::ContentCascade;
use extractor::SuggestionExtractor;
use orchestrator::SearchOrchestrator;
use server::AdvisorMcpServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stderr keeps stdout free for MCP JSON-RPC in stdio mode
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting product-advisor");

    let config = Config::from_env()?;
    info!(
        listen_addr = %config.listen_addr,
        reddit_base_url = %config.reddit_base_url,
        completion_base_url = %config.openai.base_url,
        model = %config.completion.model,
        credential = config.openai.api_key.is_some(),
        webhook = config.webhook_url.is_some(),
        "configuration loaded"
    );
    if config.openai.api_key.is_none() {
        tracing::warn!("OPENROUTER_API_KEY not set, searches will fail until it is configured");
    }

    let openai = Arc::new(OpenAiClient::new(config.openai.clone())?);
    let extractor = Arc::new(SuggestionExtractor::new(openai, config.completion.clone()));
    let content = Arc::new(ContentCascade::reddit(
        &config.reddit_base_url,
        config.reddit_timeout,
    )?);
    let sink = sink_from_url(config.webhook_url.as_deref(), config.webhook_timeout);

    let orchestrator = SearchOrchestrator::new(content, extractor, sink);

    if config.mcp_stdio {
        info!("MCP server ready, serving on stdio");
        let service = AdvisorMcpServer::new(orchestrator)
            .serve(stdio())
            .await
            .inspect_err(|e| {
                tracing::error!(error = %e, "MCP server error");
            })?;
        service.waiting().await?;
        info!("MCP server shut down");
        return Ok(());
    }

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %config.listen_addr, "HTTP server ready");
    axum::serve(listener, http::router(orchestrator)).await?;
    info!("HTTP server shut down");
    Ok(())
}
