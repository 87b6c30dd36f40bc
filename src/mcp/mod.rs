//! Model Context Protocol server
//!
//! - [`types`]  -- JSON-RPC envelopes and the MCP lifecycle and tool types
//! - [`server`] -- newline-delimited JSON-RPC server over stdio

pub mod server;
pub mod types;

pub use server::McpServer;
