//! Guarded Payload REST client
//!
//! Every call goes through [`PayloadClient::execute`], which attaches the
//! current session token, logs in when there is none, and on a 401
//! invalidates the token, re-authenticates once and retries once.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use tracing::instrument;

use super::query::SearchQuery;
use super::request::ApiRequest;
use crate::auth::{CredentialStore, LoginCoordinator, LoginOptions, Session, SessionSource};
use crate::config::PayloadConfig;
use crate::error::{PayloadMcpError, Result};

/// Result of the unauthenticated startup probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The backend answered with a success status.
    Reachable,
    /// The backend answered with a non-success status.
    Status(u16),
    /// No response could be obtained.
    Unreachable(String),
}

enum SendOutcome {
    Done(Value),
    Unauthorized,
}

/// Client for the Payload REST API with transparent login.
///
/// # Examples
///
/// ```no_run
/// use payload_mcp::client::PayloadClient;
/// use payload_mcp::config::PayloadConfig;
///
/// # async fn example() -> payload_mcp::error::Result<()> {
/// let client = PayloadClient::new(&PayloadConfig::default())?;
/// let created = client
///     .create_object("posts", serde_json::json!({ "title": "Hello" }), None)
///     .await?;
/// println!("{}", created);
/// # Ok(())
/// # }
/// ```
pub struct PayloadClient {
    http: reqwest::Client,
    api_root: String,
    store: Arc<CredentialStore>,
    login: Arc<LoginCoordinator>,
}

impl PayloadClient {
    /// Builds a client, credential store and login coordinator from config.
    ///
    /// A configured static token seeds the store.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the HTTP client cannot be built.
    pub fn new(config: &PayloadConfig) -> Result<Self> {
        let http = build_http_client(config)?;
        let store = Arc::new(match config.static_token() {
            Some(token) => CredentialStore::with_session(Session::new(token, SessionSource::Static)),
            None => CredentialStore::new(),
        });
        let login = Arc::new(LoginCoordinator::new(
            http.clone(),
            config.api_root(),
            Arc::clone(&store),
            LoginOptions::from(config),
        ));
        Ok(Self::from_parts(http, config.api_root(), store, login))
    }

    /// Assembles a client from existing parts.
    pub fn from_parts(
        http: reqwest::Client,
        api_root: impl Into<String>,
        store: Arc<CredentialStore>,
        login: Arc<LoginCoordinator>,
    ) -> Self {
        Self {
            http,
            api_root: api_root.into().trim_end_matches('/').to_string(),
            store,
            login,
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn login(&self) -> &Arc<LoginCoordinator> {
        &self.login
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// Creates one document, or one per element when `data` is an array.
    ///
    /// Array elements are created in order and the results returned as an
    /// array; the first failure stops the sequence.
    #[instrument(skip(self, data))]
    pub async fn create_object(
        &self,
        collection: &str,
        data: Value,
        locale: Option<String>,
    ) -> Result<Value> {
        let collection = require_collection(collection)?;

        match data {
            Value::Array(items) if !items.is_empty() => {
                if items.iter().any(|item| !is_non_empty_object(item)) {
                    return Err(PayloadMcpError::Validation(
                        "every element of data must be a non-empty object".into(),
                    )
                    .into());
                }
                let mut results = Vec::with_capacity(items.len());
                for item in items {
                    let request = ApiRequest::post(collection)
                        .with_body(item)
                        .with_locale(locale.clone());
                    results.push(self.execute(request).await?);
                }
                tracing::debug!(count = results.len(), "Created documents");
                Ok(Value::Array(results))
            }
            data if is_non_empty_object(&data) => {
                let request = ApiRequest::post(collection)
                    .with_body(data)
                    .with_locale(locale);
                self.execute(request).await
            }
            _ => Err(PayloadMcpError::Validation(
                "data must be a non-empty object or array of objects".into(),
            )
            .into()),
        }
    }

    /// Searches a collection.
    #[instrument(skip(self, query))]
    pub async fn search_objects(&self, collection: &str, query: &SearchQuery) -> Result<Value> {
        let collection = require_collection(collection)?;
        query.validate()?;

        let request = ApiRequest::get(collection)
            .with_query(query.to_pairs())
            .with_locale(query.locale.clone());
        self.execute(request).await
    }

    /// Updates a document by id.
    #[instrument(skip(self, data))]
    pub async fn update_object(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        locale: Option<String>,
    ) -> Result<Value> {
        let collection = require_collection(collection)?;
        let id = id.trim();
        if id.is_empty() {
            return Err(PayloadMcpError::Validation("object_id is required".into()).into());
        }
        if !is_non_empty_object(&data) {
            return Err(
                PayloadMcpError::Validation("data must be a non-empty object".into()).into(),
            );
        }

        let request = ApiRequest::patch(format!("{collection}/{id}"))
            .with_body(data)
            .with_locale(locale);
        self.execute(request).await
    }

    /// Sends `request` with the current session, logging in when needed and
    /// retrying once after a 401.
    ///
    /// # Errors
    ///
    /// - `Authentication` when no session can be obtained or the retried
    ///   request is also rejected
    /// - `Api` for any other non-success status
    /// - `Connection` for transport failures
    pub async fn execute(&self, mut request: ApiRequest) -> Result<Value> {
        let mut session = self.current_session().await?;

        loop {
            match self.send(&request, session.token()).await? {
                SendOutcome::Done(value) => return Ok(value),
                SendOutcome::Unauthorized => {
                    self.store.invalidate(session.token());
                    if !request.mark_retry() {
                        tracing::error!(path = %request.path, "Payload rejected the refreshed session");
                        return Err(PayloadMcpError::Authentication(
                            "Payload rejected the session after re-authentication".into(),
                        )
                        .into());
                    }
                    tracing::warn!(path = %request.path, "Unauthorized response, re-authenticating");
                    session = self.reauthenticate(session.token()).await?;
                }
            }
        }
    }

    /// Unauthenticated GET of the default login collection.
    pub async fn probe(&self) -> ProbeOutcome {
        let url = format!("{}/{}", self.api_root, self.login.options().collection);
        match self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .query(&[("limit", "1")])
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => ProbeOutcome::Reachable,
            Ok(resp) => ProbeOutcome::Status(resp.status().as_u16()),
            Err(e) => ProbeOutcome::Unreachable(PayloadMcpError::from_transport(&e).to_string()),
        }
    }

    /// Returns a usable session, logging in when none is stored or the
    /// stored one has expired.
    async fn current_session(&self) -> Result<Arc<Session>> {
        if let Some(session) = self.store.get() {
            if !session.is_expired() {
                return Ok(session);
            }
            tracing::info!("Stored session has expired");
            self.store.invalidate(session.token());
        }
        self.login.login().await
    }

    /// Obtains a session other than the rejected one, reusing a session a
    /// concurrent caller already stored.
    async fn reauthenticate(&self, rejected: &str) -> Result<Arc<Session>> {
        if let Some(session) = self.store.get() {
            if session.token() != rejected && !session.is_expired() {
                tracing::debug!("Reusing session refreshed by a concurrent request");
                return Ok(session);
            }
        }
        self.login.login().await
    }

    async fn send(&self, request: &ApiRequest, token: &str) -> Result<SendOutcome> {
        let url = format!("{}/{}", self.api_root, request.path);
        tracing::debug!(
            method = %request.method,
            url = %url,
            retry = request.retry_count(),
            "Sending Payload request"
        );

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .header(AUTHORIZATION, format!("JWT {token}"))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");

        let pairs = request.query_pairs();
        if !pairs.is_empty() {
            builder = builder.query(&pairs);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| PayloadMcpError::from_transport(&e))?;
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(SendOutcome::Unauthorized);
        }

        let text = resp
            .text()
            .await
            .map_err(|e| PayloadMcpError::from_transport(&e))?;

        if !status.is_success() {
            let err = PayloadMcpError::from_response(status.as_u16(), &text);
            tracing::warn!(status = status.as_u16(), "Payload request failed: {}", err);
            return Err(err.into());
        }

        let value = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "data": text }));
        Ok(SendOutcome::Done(value))
    }
}

/// Builds the HTTP client used for backend and login requests.
///
/// # Errors
///
/// Returns `Config` if the client cannot be built.
pub fn build_http_client(config: &PayloadConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .danger_accept_invalid_certs(!config.verify_ssl)
        .user_agent(concat!("payload-mcp/", env!("CARGO_PKG_VERSION")));
    if config.bypass_proxy {
        builder = builder.no_proxy();
    }
    builder
        .build()
        .map_err(|e| PayloadMcpError::Config(format!("failed to build HTTP client: {e}")).into())
}

fn require_collection(collection: &str) -> Result<&str> {
    let collection = collection.trim().trim_matches('/');
    if collection.is_empty() {
        return Err(PayloadMcpError::Validation("collection_name is required".into()).into());
    }
    Ok(collection)
}

fn is_non_empty_object(value: &Value) -> bool {
    matches!(value, Value::Object(map) if !map.is_empty())
}
