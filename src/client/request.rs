//! Outbound request description

use reqwest::Method;
use serde_json::Value;

/// Maximum number of retries after an unauthorized response.
pub const MAX_AUTH_RETRIES: u8 = 1;

/// A request to the Payload REST API.
///
/// `retry_count` records how many times the request has been re-sent after
/// a 401 and never exceeds [`MAX_AUTH_RETRIES`].
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API root, without a leading slash.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub locale: Option<String>,
    retry_count: u8,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into().trim_start_matches('/').to_string(),
            query: Vec::new(),
            body: None,
            locale: None,
            retry_count: 0,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_locale(mut self, locale: Option<String>) -> Self {
        self.locale = locale.filter(|l| !l.is_empty());
        self
    }

    pub fn retry_count(&self) -> u8 {
        self.retry_count
    }

    /// Whether another attempt is allowed after an unauthorized response.
    pub fn can_retry(&self) -> bool {
        self.retry_count < MAX_AUTH_RETRIES
    }

    /// Records a retry. Returns `false` if the retry budget is exhausted.
    pub fn mark_retry(&mut self) -> bool {
        if !self.can_retry() {
            return false;
        }
        self.retry_count += 1;
        true
    }

    /// Query pairs including the locale, as sent on the wire.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.query.clone();
        if let Some(locale) = &self.locale {
            if !pairs.iter().any(|(k, _)| k == "locale") {
                pairs.push(("locale".to_string(), locale.clone()));
            }
        }
        pairs
    }
}
