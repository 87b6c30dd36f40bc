//! `create_object` tool

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{optional_str, required_str, required_value, ToolExecutor, ToolResult};
use crate::client::PayloadClient;
use crate::error::Result;

pub const TOOL_NAME: &str = "create_object";

/// Creates one or more documents in a collection.
pub struct CreateObjectTool {
    client: Arc<PayloadClient>,
}

impl CreateObjectTool {
    pub fn new(client: Arc<PayloadClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolExecutor for CreateObjectTool {
    fn tool_definition(&self) -> Value {
        json!({
            "name": TOOL_NAME,
            "description": "Create a new document in a Payload CMS collection. Pass an array as data to create several documents in order.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "collection_name": {
                        "type": "string",
                        "description": "Slug of the collection, e.g. \"posts\""
                    },
                    "data": {
                        "description": "Document fields, or an array of documents",
                        "oneOf": [
                            { "type": "object" },
                            { "type": "array", "items": { "type": "object" } }
                        ]
                    },
                    "locale": {
                        "type": "string",
                        "description": "Locale to write localized fields in"
                    }
                },
                "required": ["collection_name", "data"]
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let collection = required_str(&args, "collection_name")?;
        let data = required_value(&args, "data")?;
        let locale = optional_str(&args, "locale")?;

        let created = self.client.create_object(collection, data, locale).await?;
        ToolResult::json(&created)
    }
}
