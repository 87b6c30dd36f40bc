//! `update_object` tool

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{optional_str, required_str, required_value, ToolExecutor, ToolResult};
use crate::client::PayloadClient;
use crate::error::{PayloadMcpError, Result};

pub const TOOL_NAME: &str = "update_object";

/// Updates a document by id.
pub struct UpdateObjectTool {
    client: Arc<PayloadClient>,
}

impl UpdateObjectTool {
    pub fn new(client: Arc<PayloadClient>) -> Self {
        Self { client }
    }
}

/// Accepts string or numeric ids.
fn object_id(args: &Value) -> Result<String> {
    match args.get("object_id") {
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::String(_)) => Ok(required_str(args, "object_id")?.to_string()),
        None | Some(Value::Null) => {
            Err(PayloadMcpError::Validation("object_id is required".into()).into())
        }
        Some(_) => Err(
            PayloadMcpError::Validation("object_id must be a string or number".into()).into(),
        ),
    }
}

#[async_trait]
impl ToolExecutor for UpdateObjectTool {
    fn tool_definition(&self) -> Value {
        json!({
            "name": TOOL_NAME,
            "description": "Update fields of an existing document in a Payload CMS collection",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "collection_name": { "type": "string", "description": "Slug of the collection" },
                    "object_id": {
                        "description": "ID of the document to update",
                        "oneOf": [{ "type": "string" }, { "type": "number" }]
                    },
                    "data": { "type": "object", "description": "Fields to change" },
                    "locale": { "type": "string", "description": "Locale of localized fields" }
                },
                "required": ["collection_name", "object_id", "data"]
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let collection = required_str(&args, "collection_name")?;
        let id = object_id(&args)?;
        let data = required_value(&args, "data")?;
        let locale = optional_str(&args, "locale")?;

        let updated = self
            .client
            .update_object(collection, &id, data, locale)
            .await?;
        ToolResult::json(&updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_accepts_string_and_number() {
        assert_eq!(object_id(&json!({ "object_id": "abc" })).unwrap(), "abc");
        assert_eq!(object_id(&json!({ "object_id": 42 })).unwrap(), "42");
    }

    #[test]
    fn test_object_id_rejects_missing_or_wrong_type() {
        assert!(object_id(&json!({})).is_err());
        assert!(object_id(&json!({ "object_id": "" })).is_err());
        assert!(object_id(&json!({ "object_id": true })).is_err());
    }
}
