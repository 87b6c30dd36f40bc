//! Tools module for payload-mcp
//!
//! This module contains the tool registry and the tools exposed over MCP:
//! creating, searching and updating Payload documents, and reporting the
//! authentication state.

pub mod create;
pub mod search;
pub mod status;
pub mod update;

use crate::client::PayloadClient;
use crate::error::{ErrorReport, PayloadMcpError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

pub use create::CreateObjectTool;
pub use search::SearchObjectsTool;
pub use status::AuthStatusTool;
pub use update::UpdateObjectTool;

/// Tool result structure
///
/// A successful result carries the text shown to the MCP client; a failed
/// one carries the structured error report.
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// Whether the tool execution succeeded
    pub success: bool,
    /// Output from the tool
    pub output: String,
    /// Error report if execution failed
    pub error: Option<ErrorReport>,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    /// Create a successful result from a JSON value, pretty-printed
    pub fn json(value: &Value) -> Result<Self> {
        Ok(Self::success(serde_json::to_string_pretty(value)?))
    }

    /// Create a failed tool result from an error
    pub fn failure(err: &anyhow::Error) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(ErrorReport::from_error(err)),
        }
    }

    /// Convert to the text block returned to the client
    ///
    /// # Returns
    ///
    /// Returns the output, or `Error: <message>` for failures
    pub fn to_message(&self) -> String {
        if self.success {
            self.output.clone()
        } else {
            format!(
                "Error: {}",
                self.error
                    .as_ref()
                    .map(|e| e.message.as_str())
                    .unwrap_or("Unknown error")
            )
        }
    }
}

/// Tool executor trait for implementing tool execution logic
///
/// # Examples
///
/// ```no_run
/// use payload_mcp::tools::{ToolExecutor, ToolResult};
/// use payload_mcp::error::Result;
/// use async_trait::async_trait;
/// use serde_json::Value;
///
/// struct Echo;
///
/// #[async_trait]
/// impl ToolExecutor for Echo {
///     fn tool_definition(&self) -> Value {
///         serde_json::json!({
///             "name": "echo",
///             "description": "Returns its arguments",
///             "inputSchema": { "type": "object", "properties": {} }
///         })
///     }
///
///     async fn execute(&self, args: Value) -> Result<ToolResult> {
///         ToolResult::json(&args)
///     }
/// }
/// ```
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Returns the MCP tool definition (`name`, `description`, `inputSchema`)
    fn tool_definition(&self) -> Value;

    /// Executes the tool with the given arguments
    ///
    /// # Errors
    ///
    /// Returns error if the arguments are invalid or the backend call fails
    async fn execute(&self, args: Value) -> Result<ToolResult>;
}

/// Tool registry for managing available tools
///
/// Tools are kept in name order so listings are stable.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ToolExecutor>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Create a registry with every Payload tool bound to `client`
    pub fn for_client(client: Arc<PayloadClient>) -> Self {
        let mut registry = Self::new();
        registry.register(
            create::TOOL_NAME,
            Arc::new(CreateObjectTool::new(Arc::clone(&client))),
        );
        registry.register(
            search::TOOL_NAME,
            Arc::new(SearchObjectsTool::new(Arc::clone(&client))),
        );
        registry.register(
            update::TOOL_NAME,
            Arc::new(UpdateObjectTool::new(Arc::clone(&client))),
        );
        registry.register(status::TOOL_NAME, Arc::new(AuthStatusTool::new(client)));
        registry
    }

    /// Register a tool executor in the registry
    pub fn register(&mut self, name: impl Into<String>, executor: Arc<dyn ToolExecutor>) {
        self.tools.insert(name.into(), executor);
    }

    /// Get a tool executor by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolExecutor>> {
        self.tools.get(name).cloned()
    }

    /// Get all tool definitions as JSON values
    pub fn all_definitions(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|executor| executor.tool_definition())
            .collect()
    }

    /// Runs a tool by name, turning every failure into a failed result
    pub async fn call(&self, name: &str, args: Value) -> ToolResult {
        let Some(executor) = self.get(name) else {
            let err = PayloadMcpError::Validation(format!("Unknown tool: {name}")).into();
            return ToolResult::failure(&err);
        };

        match executor.execute(args).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = name, "Tool call failed: {}", e);
                ToolResult::failure(&e)
            }
        }
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

/// Returns a required non-empty string argument
pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    match args.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(Value::String(_)) | None | Some(Value::Null) => {
            Err(PayloadMcpError::Validation(format!("{key} is required")).into())
        }
        Some(_) => Err(PayloadMcpError::Validation(format!("{key} must be a string")).into()),
    }
}

/// Returns an optional string argument, treating null and "" as absent
pub(crate) fn optional_str(args: &Value, key: &str) -> Result<Option<String>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(PayloadMcpError::Validation(format!("{key} must be a string")).into()),
    }
}

/// Returns a required argument of any JSON type
pub(crate) fn required_value(args: &Value, key: &str) -> Result<Value> {
    match args.get(key) {
        None | Some(Value::Null) => {
            Err(PayloadMcpError::Validation(format!("{key} is required")).into())
        }
        Some(v) => Ok(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct MockToolExecutor {
        name: String,
        fail: bool,
    }

    #[async_trait]
    impl ToolExecutor for MockToolExecutor {
        fn tool_definition(&self) -> Value {
            json!({
                "name": self.name,
                "description": "Mock tool",
                "inputSchema": {"type": "object"}
            })
        }

        async fn execute(&self, args: Value) -> Result<ToolResult> {
            if self.fail {
                return Err(PayloadMcpError::Api {
                    status: 404,
                    message: "Not Found".into(),
                    body: Value::Null,
                }
                .into());
            }
            ToolResult::json(&args)
        }
    }

    fn mock(name: &str, fail: bool) -> Arc<dyn ToolExecutor> {
        Arc::new(MockToolExecutor {
            name: name.to_string(),
            fail,
        })
    }

    #[test]
    fn test_tool_result_to_message() {
        assert_eq!(ToolResult::success("out".into()).to_message(), "out");
        let err = PayloadMcpError::Validation("collection_name is required".into()).into();
        assert_eq!(
            ToolResult::failure(&err).to_message(),
            "Error: Validation error: collection_name is required"
        );
    }

    #[test]
    fn test_registry_definitions_are_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register("zeta", mock("zeta", false));
        registry.register("alpha", mock("alpha", false));
        let names: Vec<_> = registry
            .all_definitions()
            .iter()
            .map(|d| d["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_call_unknown_tool_fails() {
        let registry = ToolRegistry::new();
        let result = registry.call("nope", json!({})).await;
        assert!(!result.success);
        assert!(result.to_message().contains("Unknown tool: nope"));
    }

    #[tokio::test]
    async fn test_call_maps_error_to_report() {
        let mut registry = ToolRegistry::new();
        registry.register("broken", mock("broken", true));
        let result = registry.call("broken", json!({})).await;
        let report = result.error.unwrap();
        assert_eq!(report.kind, crate::error::ErrorKind::Api);
        assert_eq!(report.status, Some(404));
    }

    #[tokio::test]
    async fn test_call_success_pretty_prints() {
        let mut registry = ToolRegistry::new();
        registry.register("echo", mock("echo", false));
        let result = registry.call("echo", json!({ "a": 1 })).await;
        assert!(result.success);
        assert_eq!(result.output, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_argument_helpers() {
        let args = json!({ "name": "posts", "blank": "  ", "num": 3, "loc": "" });
        assert_eq!(required_str(&args, "name").unwrap(), "posts");
        assert!(required_str(&args, "blank").is_err());
        assert!(required_str(&args, "num").is_err());
        assert!(required_str(&args, "missing").is_err());
        assert_eq!(optional_str(&args, "loc").unwrap(), None);
        assert!(optional_str(&args, "num").is_err());
        assert!(required_value(&args, "missing").is_err());
        assert_eq!(required_value(&args, "num").unwrap(), json!(3));
    }
}
