//! payload-mcp - MCP server for Payload CMS
//!
#![doc = "Main entry point for the payload-mcp server."]

use std::sync::Arc;

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use payload_mcp::cli::{Cli, Commands};
use payload_mcp::client::{PayloadClient, ProbeOutcome};
use payload_mcp::config::Config;
use payload_mcp::mcp::McpServer;
use payload_mcp::tools::ToolRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Initialize tracing once the log level is known
    init_tracing(&config.log_level);

    // Validate configuration
    config.validate()?;

    match cli.command() {
        Commands::Serve => {
            tracing::info!(base_url = %config.payload.base_url, "Starting MCP server");
            serve(config).await
        }
        Commands::Login { collection } => {
            let mut config = config;
            if let Some(c) = collection {
                tracing::debug!("Using collection override: {}", c);
                config.payload.login.collection = c;
            }
            login(config).await
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    let client = Arc::new(PayloadClient::new(&config.payload)?);

    if config.payload.static_token().is_some() {
        tracing::info!("Using static token from configuration");
    } else {
        tracing::info!("No token configured; the first tool call will open a browser login");
    }

    match client.probe().await {
        ProbeOutcome::Reachable => tracing::info!("Payload CMS is reachable"),
        ProbeOutcome::Status(status) => {
            tracing::info!(status, "Payload CMS answered the connection check")
        }
        ProbeOutcome::Unreachable(reason) => {
            tracing::warn!("Payload CMS is not reachable yet: {}", reason)
        }
    }

    let registry = Arc::new(ToolRegistry::for_client(client));
    tracing::info!(tools = registry.len(), "Serving MCP over stdio");
    Arc::new(McpServer::new(registry)).serve_stdio().await
}

async fn login(config: Config) -> Result<()> {
    let client = PayloadClient::new(&config.payload)?;

    match client.login().login().await {
        Ok(session) => {
            let collection = client
                .login()
                .current_attempt()
                .await
                .map(|a| a.collection)
                .unwrap_or_else(|| config.payload.login.collection.clone());
            let expiry = session
                .expires_at()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string());
            eprintln!("Logged in to '{collection}' (session expires: {expiry})");
            Ok(())
        }
        Err(e) => {
            eprintln!("Login failed: {e}");
            Err(e)
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr; stdout carries MCP protocol messages only.
fn init_tracing(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("payload_mcp={}", log_level.to_lowercase())));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
