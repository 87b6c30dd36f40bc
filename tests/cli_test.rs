//! Binary smoke tests

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

use common::temp_config_file;

#[test]
fn test_version_names_the_binary() {
    Command::cargo_bin("payload-mcp")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("payload-mcp"));
}

#[test]
fn test_login_help_lists_collection_flag() {
    Command::cargo_bin("payload-mcp")
        .unwrap()
        .args(["login", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--collection"));
}

#[test]
fn test_unknown_subcommand_fails() {
    Command::cargo_bin("payload-mcp")
        .unwrap()
        .arg("chat")
        .assert()
        .failure();
}

#[test]
fn test_invalid_config_is_rejected_before_serving() {
    let (_dir, path) = temp_config_file("payload:\n  base_url: \"not a url\"\n");
    Command::cargo_bin("payload-mcp")
        .unwrap()
        .env_remove("PAYLOAD_MCP_PAYLOAD__BASE_URL")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(&path)
        .arg("serve")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("base_url"));
}

#[test]
fn test_serve_exits_cleanly_when_input_closes() {
    let (_dir, path) = temp_config_file(
        "payload:\n  base_url: \"http://127.0.0.1:1/api\"\n  auth_token: \"static-token\"\n  timeout_seconds: 2\n",
    );
    Command::cargo_bin("payload-mcp")
        .unwrap()
        .env_remove("PAYLOAD_MCP_PAYLOAD__BASE_URL")
        .env_remove("PAYLOAD_MCP_PAYLOAD__AUTH_TOKEN")
        .arg("--config")
        .arg(&path)
        .write_stdin("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\":1"));
}
