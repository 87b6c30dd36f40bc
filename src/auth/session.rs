//! Session tokens and their metadata
//!
//! A [`Session`] is the single JWT this process uses to talk to Payload,
//! together with where it came from and, when the token carries one, the
//! moment it stops being valid.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// SessionSource
// ---------------------------------------------------------------------------

/// Where a session token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
    /// Supplied through configuration at startup.
    Static,
    /// Obtained through the interactive browser login.
    Interactive,
}

impl std::fmt::Display for SessionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Interactive => write!(f, "interactive"),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A Payload session token with provenance and expiry metadata.
///
/// `Debug` output never contains the token itself.
///
/// # Examples
///
/// ```
/// use payload_mcp::auth::session::{Session, SessionSource};
///
/// let session = Session::new("opaque-token", SessionSource::Static);
/// assert_eq!(session.token(), "opaque-token");
/// assert!(session.expires_at().is_none());
/// assert!(!session.is_expired());
/// assert!(!format!("{:?}", session).contains("opaque-token"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    source: SessionSource,
    obtained_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Creates a session, decoding the expiry from the token when it is a
    /// JWT with an `exp` claim.
    pub fn new(token: impl Into<String>, source: SessionSource) -> Self {
        let token = token.into();
        let expires_at = decode_jwt_expiry(&token);
        Self {
            token,
            source,
            obtained_at: Utc::now(),
            expires_at,
        }
    }

    /// Overrides the expiry, e.g. with the `exp` returned by a login response.
    pub fn with_expiry(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        if expires_at.is_some() {
            self.expires_at = expires_at;
        }
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn source(&self) -> SessionSource {
        self.source
    }

    pub fn obtained_at(&self) -> DateTime<Utc> {
        self.obtained_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns `true` once the decoded expiry has passed.
    ///
    /// Sessions without an expiry are never considered expired; the backend
    /// remains the authority and a 401 invalidates them.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Utc::now() >= exp)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("source", &self.source)
            .field("obtained_at", &self.obtained_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Converts a Unix timestamp in seconds into a UTC time.
pub fn timestamp_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

/// Reads the `exp` claim from a JWT without verifying its signature.
///
/// Returns `None` for anything that is not a three-part token with a
/// base64url JSON payload carrying a numeric `exp`.
fn decode_jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?;
    let secs = exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))?;
    timestamp_to_utc(secs)
}
