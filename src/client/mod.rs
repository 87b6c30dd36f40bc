//! Payload CMS REST client
//!
//! - [`payload`] -- guarded client with transparent login and one auth retry
//! - [`query`]   -- bracket-notation encoding of search options
//! - [`request`] -- outbound request description and retry budget

pub mod payload;
pub mod query;
pub mod request;

pub use payload::{build_http_client, PayloadClient, ProbeOutcome};
pub use query::SearchQuery;
pub use request::{ApiRequest, MAX_AUTH_RETRIES};
