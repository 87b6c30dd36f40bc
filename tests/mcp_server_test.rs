//! End-to-end MCP tests: JSON-RPC lines in, Payload requests out

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use payload_mcp::mcp::McpServer;
use payload_mcp::tools::ToolRegistry;

use common::{client_with_browser, IdleBrowser};

/// Writes `requests` to an MCP server backed by `server`, closes its input
/// and collects every response line.
async fn exchange(server: &MockServer, token: Option<&str>, requests: &[Value]) -> Vec<Value> {
    let mut input = Vec::new();
    for request in requests {
        input.extend(serde_json::to_vec(request).unwrap());
        input.push(b'\n');
    }
    exchange_raw(server, token, &input).await
}

async fn exchange_raw(server: &MockServer, token: Option<&str>, input: &[u8]) -> Vec<Value> {
    let client = client_with_browser(
        server,
        token,
        Arc::new(IdleBrowser::default()),
        Duration::from_secs(5),
    );
    let registry = Arc::new(ToolRegistry::for_client(Arc::new(client)));
    let mcp = Arc::new(McpServer::new(registry));

    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_io);
    let handle = tokio::spawn(mcp.serve(BufReader::new(server_read), server_write));

    let (client_read, mut client_write) = tokio::io::split(client_io);
    client_write.write_all(input).await.unwrap();
    client_write.shutdown().await.unwrap();
    drop(client_write);

    let mut lines = BufReader::new(client_read).lines();
    let mut responses = Vec::new();
    while let Some(line) = lines.next_line().await.unwrap() {
        responses.push(serde_json::from_str(&line).unwrap());
    }
    handle.await.unwrap().unwrap();
    responses
}

fn by_id(responses: &[Value], id: i64) -> &Value {
    responses
        .iter()
        .find(|r| r["id"] == id)
        .unwrap_or_else(|| panic!("no response with id {id}"))
}

#[tokio::test]
async fn test_initialize_and_list_tools() {
    let server = MockServer::start().await;
    let responses = exchange(
        &server,
        Some("static-token"),
        &[
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": {
                    "protocolVersion": "1999-01-01",
                    "capabilities": {},
                    "clientInfo": { "name": "test-client", "version": "0.0.1" }
                }
            }),
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
            json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
        ],
    )
    .await;

    assert_eq!(responses.len(), 2);

    let init = &by_id(&responses, 1)["result"];
    assert_eq!(init["protocolVersion"], "2025-11-25");
    assert_eq!(init["serverInfo"]["name"], "payload-mcp");

    let tools = by_id(&responses, 2)["result"]["tools"].as_array().unwrap();
    let mut names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec!["auth_status", "create_object", "search_objects", "update_object"]
    );
    for tool in tools {
        assert_eq!(tool["inputSchema"]["type"], "object");
    }

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_object_call_reaches_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/posts"))
        .and(header("authorization", "JWT static-token"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "doc": { "id": "p1", "title": "From MCP" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let responses = exchange(
        &server,
        Some("static-token"),
        &[json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {
                "name": "create_object",
                "arguments": {
                    "collection_name": "posts",
                    "data": { "title": "From MCP" }
                }
            }
        })],
    )
    .await;

    let result = &by_id(&responses, 7)["result"];
    assert_eq!(result["isError"], false);
    let text = result["content"][0]["text"].as_str().unwrap();
    let body: Value = serde_json::from_str(text).unwrap();
    assert_eq!(body["doc"]["id"], "p1");
}

#[tokio::test]
async fn test_backend_rejection_is_a_tool_error() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/posts/9"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "errors": [{ "message": "You are not allowed to perform this action." }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let responses = exchange(
        &server,
        Some("static-token"),
        &[json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {
                "name": "update_object",
                "arguments": {
                    "collection_name": "posts",
                    "object_id": 9,
                    "data": { "title": "Nope" }
                }
            }
        })],
    )
    .await;

    let response = by_id(&responses, 3);
    assert!(response.get("error").is_none());
    let result = &response["result"];
    assert_eq!(result["isError"], true);
    assert!(result["content"][0]["text"]
        .as_str()
        .unwrap()
        .starts_with("Error: "));
    assert_eq!(result["structuredContent"]["kind"], "api");
    assert_eq!(result["structuredContent"]["status"], 403);
}

#[tokio::test]
async fn test_invalid_arguments_never_reach_payload() {
    let server = MockServer::start().await;
    let responses = exchange(
        &server,
        Some("static-token"),
        &[
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "tools/call",
                "params": { "name": "create_object", "arguments": { "data": { "a": 1 } } }
            }),
            json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": {
                    "name": "search_objects",
                    "arguments": { "collection_name": "posts", "limit": 0 }
                }
            }),
        ],
    )
    .await;

    for id in [1, 2] {
        let result = &by_id(&responses, id)["result"];
        assert_eq!(result["isError"], true);
        assert_eq!(result["structuredContent"]["kind"], "validation");
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_auth_status_reports_static_session() {
    let server = MockServer::start().await;
    let responses = exchange(
        &server,
        Some("static-token"),
        &[json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": { "name": "auth_status", "arguments": {} }
        })],
    )
    .await;

    let result = &by_id(&responses, 4)["result"];
    assert_eq!(result["isError"], false);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(!text.contains("static-token"));

    let status: Value = serde_json::from_str(text).unwrap();
    assert_eq!(status["has_token"], true);
    assert_eq!(status["source"], "static");
    assert_eq!(status["login_state"], "idle");
}

#[tokio::test]
async fn test_non_utf8_line_gets_parse_error_and_serving_continues() {
    let server = MockServer::start().await;
    let mut input = Vec::new();
    input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n");
    input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"\xff\xfe\"}\n");
    input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}\n");

    let responses = exchange_raw(&server, Some("static-token"), &input).await;

    assert_eq!(responses.len(), 3);
    assert_eq!(by_id(&responses, 1)["result"], json!({}));
    assert_eq!(by_id(&responses, 3)["result"], json!({}));

    let parse_error = responses
        .iter()
        .find(|r| r["id"].is_null())
        .expect("parse error response");
    assert_eq!(parse_error["error"]["code"], -32700);
}
