//! payload-mcp - MCP server for Payload CMS
//!
//! This library exposes Payload CMS collections as MCP tools and manages the
//! session token behind them: a static token from configuration, or one
//! obtained through a browser login that runs at most once at a time.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: Session store, browser login flow and credential exchange
//! - `client`: Guarded REST client with one retry after re-authentication
//! - `tools`: MCP tools and the tool registry
//! - `mcp`: JSON-RPC types and the stdio server
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use payload_mcp::{Config, McpServer, PayloadClient, ToolRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let client = Arc::new(PayloadClient::new(&config.payload)?);
//!     let registry = Arc::new(ToolRegistry::for_client(client));
//!     Arc::new(McpServer::new(registry)).serve_stdio().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod mcp;
pub mod tools;

// Re-export commonly used types
pub use auth::{CredentialStore, LoginCoordinator, LoginState, Session, SessionSource};
pub use client::PayloadClient;
pub use config::Config;
pub use error::{PayloadMcpError, Result};
pub use mcp::McpServer;
pub use tools::ToolRegistry;
