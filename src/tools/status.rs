//! `auth_status` tool

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use super::{ToolExecutor, ToolResult};
use crate::auth::{LoginState, SessionSource};
use crate::client::PayloadClient;
use crate::error::Result;

pub const TOOL_NAME: &str = "auth_status";

/// Reports the current session and login state without touching the backend.
pub struct AuthStatusTool {
    client: Arc<PayloadClient>,
}

impl AuthStatusTool {
    pub fn new(client: Arc<PayloadClient>) -> Self {
        Self { client }
    }
}

/// Snapshot returned by `auth_status`; never contains the token.
#[derive(Debug, Serialize)]
pub struct AuthStatus {
    pub has_token: bool,
    pub source: Option<SessionSource>,
    pub obtained_at: Option<String>,
    pub expires_at: Option<String>,
    pub is_expired: bool,
    pub login_collection: String,
    pub login_state: LoginState,
    pub login_attempts: u64,
}

impl AuthStatus {
    pub async fn collect(client: &PayloadClient) -> Self {
        let session = client.store().get();
        let login = client.login();
        Self {
            has_token: session.is_some(),
            source: session.as_ref().map(|s| s.source()),
            obtained_at: session.as_ref().map(|s| s.obtained_at().to_rfc3339()),
            expires_at: session
                .as_ref()
                .and_then(|s| s.expires_at())
                .map(|t| t.to_rfc3339()),
            is_expired: session.as_ref().is_some_and(|s| s.is_expired()),
            login_collection: login.options().collection.clone(),
            login_state: login.state().await,
            login_attempts: login.attempts_started(),
        }
    }
}

#[async_trait]
impl ToolExecutor for AuthStatusTool {
    fn tool_definition(&self) -> Value {
        json!({
            "name": TOOL_NAME,
            "description": "Show whether a Payload session is available and the state of the browser login",
            "inputSchema": { "type": "object", "properties": {} }
        })
    }

    async fn execute(&self, _args: Value) -> Result<ToolResult> {
        let status = AuthStatus::collect(&self.client).await;
        ToolResult::json(&serde_json::to_value(status)?)
    }
}
