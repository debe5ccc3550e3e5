mod aggregate;
mod config;
mod error;
mod evaluator;
mod feedback;
mod grader;
mod model;
mod prompt;
mod rate_limit;
mod server;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tracing::info;
use tracing_subscriber::EnvFilter;

use grader_common::generation::OpenAiGenerator;
use grader_common::openai::OpenAiClient;

use config::Config;
use grader::Grader;
use rate_limit::RateLimiter;
use server::GraderServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting answer-grader MCP server");

    let config = Config::from_env()?;
    info!(
        base_url = %config.openai.base_url,
        model = %config.generation.model,
        timeout_ms = config.generation_timeout.as_millis(),
        max_retries = config.openai.max_retries,
        rate_limit_rps = config.rate_limit_rps,
        "configuration loaded"
    );

    let openai = Arc::new(OpenAiClient::new(config.openai.clone())?);
    let generator = Arc::new(OpenAiGenerator::new(
        Arc::clone(&openai),
        config.generation.clone(),
    ));
    let grader = Grader::new(generator, config.generation_timeout);
    let limiter = RateLimiter::new(config.rate_limit_rps);

    let server = GraderServer::new(grader, openai, limiter);

    info!("MCP server ready, serving on stdio");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!(error = %e, "MCP server error");
    })?;

    service.waiting().await?;
    info!("MCP server shut down");
    Ok(())
}
