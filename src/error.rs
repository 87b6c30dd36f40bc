//! Error types for payload-mcp
//!
//! This module defines all error types used throughout the server,
//! using `thiserror` for ergonomic error handling. The four core kinds
//! (`Validation`, `Authentication`, `Api`, `Connection`) are what the tool
//! layer reports back to the calling MCP client.

use serde::Serialize;
use thiserror::Error;

/// Main error type for payload-mcp operations
///
/// Every variant maps onto an [`ErrorKind`] so the dispatch layer can render
/// a structured error (kind, message, optional backend status) without
/// inspecting message text.
#[derive(Error, Debug)]
pub enum PayloadMcpError {
    /// A required field is missing or invalid; no network call was made
    #[error("Validation error: {0}")]
    Validation(String),

    /// No token could be obtained, or the backend rejected the token twice
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The backend answered with a non-success status other than 401
    #[error("API request failed: {status} - {message}")]
    Api {
        /// HTTP status code returned by the backend
        status: u16,
        /// Human-readable message extracted from the response body
        message: String,
        /// Parsed response body, or `Null` when the body was not JSON
        body: serde_json::Value,
    },

    /// Transport-level failure (connection refused, DNS, timeout)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Coarse classification of a [`PayloadMcpError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Authentication,
    Api,
    Connection,
    Config,
    Internal,
}

impl PayloadMcpError {
    /// Returns the classification used when reporting this error to a caller
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Api { .. } => ErrorKind::Api,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) | Self::Serialization(_) | Self::Yaml(_) => ErrorKind::Internal,
        }
    }

    /// Returns the backend status code, when the error carries one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Builds an API error from a non-success response.
    ///
    /// The message is the backend's top-level `message`, else the first
    /// `errors[].message`, else a text derived from the status code.
    pub fn from_response(status: u16, text: &str) -> Self {
        let body: serde_json::Value = serde_json::from_str(text).unwrap_or(serde_json::Value::Null);
        let message = extract_message(&body).unwrap_or_else(|| {
            let trimmed = text.trim();
            if trimmed.is_empty() || !body.is_null() {
                status_text(status).to_string()
            } else {
                truncate_body(trimmed)
            }
        });
        Self::Api {
            status,
            message,
            body,
        }
    }

    /// Maps a transport error from `reqwest` onto the connection kind
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Connection(format!("request timed out: {err}"))
        } else if err.is_connect() {
            Self::Connection(format!("failed to connect to Payload CMS: {err}"))
        } else {
            Self::Connection(format!("HTTP error: {err}"))
        }
    }
}

/// Maximum length for non-JSON error bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

fn extract_message(body: &serde_json::Value) -> Option<String> {
    if let Some(msg) = body.get("message").and_then(|m| m.as_str()) {
        return Some(msg.to_string());
    }
    body.get("errors")?
        .as_array()?
        .iter()
        .find_map(|e| e.get("message").and_then(|m| m.as_str()))
        .map(str::to_string)
}

fn status_text(status: u16) -> &'static str {
    match status {
        400 => "Bad request",
        401 => "Unauthorized",
        403 => "Access forbidden",
        404 => "Resource not found",
        409 => "Conflict",
        413 => "Payload too large",
        422 => "Unprocessable entity",
        429 => "Rate limit exceeded",
        500..=599 => "Server error",
        _ => "Client error",
    }
}

/// Structured error report handed back to the dispatch layer
///
/// # Examples
///
/// ```
/// use payload_mcp::error::{ErrorKind, ErrorReport, PayloadMcpError};
///
/// let err: anyhow::Error = PayloadMcpError::Validation("collection_name is required".into()).into();
/// let report = ErrorReport::from_error(&err);
/// assert_eq!(report.kind, ErrorKind::Validation);
/// assert!(report.status.is_none());
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    /// Error classification
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
    /// Backend status code, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorReport {
    /// Builds a report from any error, falling back to `Internal` for
    /// errors that did not originate in this crate.
    pub fn from_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<PayloadMcpError>() {
            Some(e) => Self {
                kind: e.kind(),
                message: e.to_string(),
                status: e.status_code(),
            },
            None => Self {
                kind: ErrorKind::Internal,
                message: err.to_string(),
                status: None,
            },
        }
    }
}

/// Result type alias for payload-mcp operations
///
/// Uses `anyhow::Error` so callers get rich context; downcast to
/// [`PayloadMcpError`] to recover the structured kind.
pub type Result<T> = anyhow::Result<T>;
