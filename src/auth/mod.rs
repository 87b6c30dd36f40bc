//! Payload session management
//!
//! # Module Layout
//!
//! - [`session`]  -- session token with provenance and expiry metadata
//! - [`store`]    -- in-memory credential store shared by client and login
//! - [`login`]    -- single-flight interactive login coordinator
//! - [`callback`] -- local HTTP listener serving the login form
//! - [`exchange`] -- credential exchange with the collection login endpoint

pub mod callback;
pub mod exchange;
pub mod login;
pub mod session;
pub mod store;

pub use login::{BrowserLauncher, LoginAttempt, LoginCoordinator, LoginOptions, LoginState};
pub use session::{Session, SessionSource};
pub use store::CredentialStore;
