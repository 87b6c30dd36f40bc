//! Command-line interface definition for payload-mcp
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand};

/// payload-mcp - MCP server for Payload CMS
///
/// Exposes create, search and update tools over stdio and logs in to
/// Payload through the browser when no token is configured.
#[derive(Parser, Debug, Clone)]
#[command(name = "payload-mcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "PAYLOAD_MCP_CONFIG", default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute; defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands for payload-mcp
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the MCP server on stdin/stdout
    Serve,

    /// Run one interactive browser login and report the outcome
    Login {
        /// Collection to authenticate against (overrides config)
        #[arg(long)]
        collection: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Command to run, falling back to `serve`
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            command: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert_eq!(cli.command(), Commands::Serve);
    }

    #[test]
    fn test_cli_parse_without_subcommand_serves() {
        let cli = Cli::try_parse_from(["payload-mcp"]).unwrap();
        assert_eq!(cli.command(), Commands::Serve);
    }

    #[test]
    fn test_cli_parse_serve_command() {
        let cli = Cli::try_parse_from(["payload-mcp", "serve"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Serve));
    }

    #[test]
    fn test_cli_parse_login_with_collection() {
        let cli = Cli::try_parse_from(["payload-mcp", "login", "--collection", "admins"]).unwrap();
        assert_eq!(
            cli.command(),
            Commands::Login {
                collection: Some("admins".to_string())
            }
        );
    }

    #[test]
    fn test_cli_parse_verbose_and_config() {
        let cli =
            Cli::try_parse_from(["payload-mcp", "-v", "--config", "custom.yaml", "serve"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some("custom.yaml".to_string()));
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["payload-mcp", "chat"]).is_err());
    }
}
