//! Stdio MCP server
//!
//! Reads newline-delimited JSON-RPC messages, handles every request on its
//! own task and funnels responses through a single writer task so lines are
//! never interleaved. Only protocol messages are written to the output;
//! logging goes to stderr.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::types::{
    negotiate_protocol_version, CallToolParams, CallToolResponse, Implementation,
    InitializeParams, InitializeResponse, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ListToolsResponse, ServerCapabilities, ToolResponseContent, INTERNAL_ERROR, INVALID_PARAMS,
    INVALID_REQUEST, METHOD_INITIALIZE, METHOD_INITIALIZED, METHOD_NOT_FOUND, METHOD_PING,
    METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, PARSE_ERROR,
};
use crate::error::Result;
use crate::tools::ToolRegistry;

pub const SERVER_NAME: &str = "payload-mcp";

/// MCP server dispatching tool calls to a [`ToolRegistry`].
pub struct McpServer {
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Serves process stdin/stdout until stdin closes.
    pub async fn serve_stdio(self: Arc<Self>) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    /// Serves one connection until `reader` reaches EOF.
    ///
    /// Requests still running at EOF, or when reading fails, are allowed to
    /// finish and their responses are flushed before returning. A line that
    /// is not UTF-8 is answered with a parse error.
    pub async fn serve<R, W>(self: Arc<Self>, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

        let writer_task = tokio::spawn(async move {
            while let Some(line) = out_rx.recv().await {
                if writer.write_all(line.as_bytes()).await.is_err()
                    || writer.write_all(b"\n").await.is_err()
                    || writer.flush().await.is_err()
                {
                    tracing::error!("Failed to write MCP response; stopping writer");
                    break;
                }
            }
        });

        let mut in_flight = JoinSet::new();
        let mut buf = Vec::new();

        let read_result = loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break Ok(()),
                Ok(_) => {}
                Err(e) => break Err(e),
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(s) => s.trim().to_string(),
                Err(e) => {
                    tracing::warn!("Non UTF-8 JSON-RPC message: {}", e);
                    send_response(
                        &out_tx,
                        &JsonRpcResponse::failure(
                            Value::Null,
                            JsonRpcError::new(PARSE_ERROR, "Parse error"),
                        ),
                    );
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            let server = Arc::clone(&self);
            let out_tx = out_tx.clone();
            in_flight.spawn(async move {
                if let Some(response) = server.handle_line(&line).await {
                    send_response(&out_tx, &response);
                }
            });

            while let Some(joined) = in_flight.try_join_next() {
                if let Err(e) = joined {
                    tracing::error!("MCP request task failed: {}", e);
                }
            }
        };

        match &read_result {
            Ok(()) => tracing::info!("MCP input closed"),
            Err(e) => tracing::error!("Failed to read MCP input: {}", e),
        }
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                tracing::error!("MCP request task failed: {}", e);
            }
        }

        drop(out_tx);
        let _ = writer_task.await;
        read_result?;
        Ok(())
    }

    /// Handles one raw message. Returns `None` for notifications.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Malformed JSON-RPC message: {}", e);
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    JsonRpcError::new(PARSE_ERROR, "Parse error"),
                ));
            }
        };

        let id_hint = raw.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(raw) {
            Ok(r) => r,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    id_hint,
                    JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {e}")),
                ));
            }
        };

        self.handle_request(request).await
    }

    /// Dispatches a parsed request. Returns `None` for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        tracing::debug!(method = %request.method, "MCP request");

        let Some(id) = request.id.clone() else {
            if request.method != METHOD_INITIALIZED {
                tracing::debug!(method = %request.method, "Ignoring notification");
            }
            return None;
        };

        let outcome = match request.method.as_str() {
            METHOD_INITIALIZE => self.initialize(request.params),
            METHOD_PING => Ok(json!({})),
            METHOD_TOOLS_LIST => self.list_tools(),
            METHOD_TOOLS_CALL => self.call_tool(request.params).await,
            other => Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    fn initialize(&self, params: Option<Value>) -> std::result::Result<Value, JsonRpcError> {
        let params: InitializeParams = parse_params(params)?;
        let version = negotiate_protocol_version(&params.protocol_version);
        tracing::info!(
            requested = %params.protocol_version,
            negotiated = version,
            client = params.client_info.as_ref().map(|c| c.name.as_str()).unwrap_or("unknown"),
            "MCP client initialized"
        );

        to_value(&InitializeResponse {
            protocol_version: version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(json!({})),
            },
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "Create, search and update Payload CMS documents. A browser login opens automatically when no session is available.".to_string(),
            ),
        })
    }

    fn list_tools(&self) -> std::result::Result<Value, JsonRpcError> {
        to_value(&ListToolsResponse {
            tools: self.registry.all_definitions(),
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> std::result::Result<Value, JsonRpcError> {
        let params: CallToolParams = parse_params(params)?;
        let args = params.arguments.unwrap_or_else(|| json!({}));

        tracing::info!(tool = %params.name, "Tool call");
        let result = self.registry.call(&params.name, args).await;

        let structured_content = match &result.error {
            Some(report) => Some(to_value(report)?),
            None => None,
        };
        to_value(&CallToolResponse {
            content: vec![ToolResponseContent::Text {
                text: result.to_message(),
            }],
            is_error: !result.success,
            structured_content,
        })
    }
}

fn send_response(out_tx: &mpsc::UnboundedSender<String>, response: &JsonRpcResponse) {
    match serde_json::to_string(response) {
        Ok(s) => {
            let _ = out_tx.send(s);
        }
        Err(e) => tracing::error!("Failed to serialize MCP response: {}", e),
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(
    params: Option<Value>,
) -> std::result::Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "Missing params"))?;
    serde_json::from_value(params)
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {e}")))
}

fn to_value<T: serde::Serialize>(value: &T) -> std::result::Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::new(INTERNAL_ERROR, e.to_string()))
}
