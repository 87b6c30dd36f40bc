//! `search_objects` tool

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{required_str, ToolExecutor, ToolResult};
use crate::client::{PayloadClient, SearchQuery};
use crate::error::{PayloadMcpError, Result};

pub const TOOL_NAME: &str = "search_objects";

/// Searches a collection with Payload's query syntax.
pub struct SearchObjectsTool {
    client: Arc<PayloadClient>,
}

impl SearchObjectsTool {
    pub fn new(client: Arc<PayloadClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolExecutor for SearchObjectsTool {
    fn tool_definition(&self) -> Value {
        json!({
            "name": TOOL_NAME,
            "description": "Search documents in a Payload CMS collection. `query` follows Payload's where syntax, e.g. {\"title\": {\"like\": \"hello\"}}; a plain value means equals.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "collection_name": { "type": "string", "description": "Slug of the collection" },
                    "query": { "type": "object", "description": "Where clause keyed by field, then operator" },
                    "limit": { "type": "integer", "minimum": 1 },
                    "page": { "type": "integer", "minimum": 1 },
                    "sort": { "type": "string", "description": "Field to sort by; prefix with - for descending" },
                    "depth": { "type": "integer", "minimum": 0, "description": "Relationship population depth" },
                    "locale": { "type": "string" },
                    "fallback_locale": { "type": "string" },
                    "select": { "type": "object", "description": "Fields to include, e.g. {\"title\": true}" },
                    "populate": { "type": "object", "description": "Fields to populate from related documents" },
                    "joins": { "type": "object", "description": "Options for join fields" },
                    "trash": { "type": "boolean", "description": "Include soft-deleted documents" }
                },
                "required": ["collection_name"]
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let collection = required_str(&args, "collection_name")?;
        let query: SearchQuery = serde_json::from_value(args.clone()).map_err(|e| {
            PayloadMcpError::Validation(format!("invalid search arguments: {e}"))
        })?;

        let results = self.client.search_objects(collection, &query).await?;
        ToolResult::json(&results)
    }
}
