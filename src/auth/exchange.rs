//! Credential exchange against a Payload collection login endpoint

use serde::{Deserialize, Serialize};

use super::session::{timestamp_to_utc, Session, SessionSource};
use crate::error::{PayloadMcpError, Result};

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Body returned by `POST /{collection}/login`.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Exchanges a username and password for an interactive [`Session`].
///
/// # Errors
///
/// Returns `Authentication` when the backend rejects the credentials or the
/// response carries no token, and `Connection` on transport failures.
pub async fn exchange_credentials(
    http: &reqwest::Client,
    api_root: &str,
    collection: &str,
    username: &str,
    password: &str,
) -> Result<Session> {
    let url = format!("{}/{}/login", api_root, collection);
    tracing::debug!(url = %url, "Exchanging credentials");

    let resp = http
        .post(&url)
        .json(&LoginRequest {
            email: username,
            password,
        })
        .send()
        .await
        .map_err(|e| PayloadMcpError::from_transport(&e))?;

    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| PayloadMcpError::from_transport(&e))?;

    if !status.is_success() {
        let reason = match PayloadMcpError::from_response(status.as_u16(), &text) {
            PayloadMcpError::Api { message, .. } => message,
            other => other.to_string(),
        };
        return Err(PayloadMcpError::Authentication(format!(
            "login to '{}' failed ({}): {}",
            collection,
            status.as_u16(),
            reason
        ))
        .into());
    }

    let body: LoginResponse = serde_json::from_str(&text).map_err(|e| {
        PayloadMcpError::Authentication(format!("failed to parse login response: {e}"))
    })?;

    let token = body
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| PayloadMcpError::Authentication("login response carried no token".into()))?;

    Ok(Session::new(token, SessionSource::Interactive)
        .with_expiry(body.exp.and_then(timestamp_to_utc)))
}
