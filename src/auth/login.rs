//! Interactive browser login
//!
//! A [`LoginCoordinator`] runs at most one login attempt at a time. The first
//! caller that needs a session starts an attempt on its own task; every other
//! caller joins it and waits for the same terminal state. Progress is
//! published as a [`LoginAttempt`] over a `tokio::sync::watch` channel.
//!
//! An attempt walks through these states:
//!
//! ```text
//! idle -> listening -> awaiting_submission -> exchanging -> succeeded
//!                                                      \-> failed
//! ```
//!
//! The deadline forces `failed` from any non-terminal state. The callback
//! listener is always stopped before the terminal state is published.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::Instant;

use super::callback::{CallbackListener, Submission, SubmissionOutcome};
use super::exchange::exchange_credentials;
use super::session::Session;
use super::store::CredentialStore;
use crate::config::PayloadConfig;
use crate::error::{PayloadMcpError, Result};

// ---------------------------------------------------------------------------
// LoginState / LoginAttempt
// ---------------------------------------------------------------------------

/// State of a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginState {
    Idle,
    Listening,
    AwaitingSubmission,
    Exchanging,
    Succeeded,
    Failed,
}

impl LoginState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns `true` while the attempt is in progress.
    pub fn is_active(self) -> bool {
        !self.is_terminal() && self != Self::Idle
    }
}

impl std::fmt::Display for LoginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::AwaitingSubmission => "awaiting_submission",
            Self::Exchanging => "exchanging",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Snapshot of a login attempt as published to waiters.
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    /// Sequence number, starting at 1 for the first attempt of the process.
    pub id: u64,
    pub state: LoginState,
    /// Collection used for the credential exchange.
    pub collection: String,
    /// URL of the login form once the listener is bound.
    pub callback_url: Option<String>,
    pub deadline: Instant,
    /// Session obtained by a successful attempt.
    pub session: Option<Arc<Session>>,
    /// Reason for a failed attempt.
    pub error: Option<String>,
}

impl LoginAttempt {
    fn new(id: u64, collection: String, deadline: Instant) -> Self {
        Self {
            id,
            state: LoginState::Idle,
            collection,
            callback_url: None,
            deadline,
            session: None,
            error: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Browser launching
// ---------------------------------------------------------------------------

/// Opens the login form for the user.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Opens URLs with the operating system's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        #[cfg(target_os = "macos")]
        {
            std::process::Command::new("open").arg(url).spawn()?;
        }
        #[cfg(target_os = "windows")]
        {
            std::process::Command::new("cmd")
                .args(["/C", "start", "", url])
                .spawn()?;
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            std::process::Command::new("xdg-open").arg(url).spawn()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LoginOptions
// ---------------------------------------------------------------------------

/// Settings for login attempts.
#[derive(Debug, Clone)]
pub struct LoginOptions {
    /// Collection pre-filled in the form and used when none is submitted.
    pub collection: String,
    /// Upper bound on a single attempt.
    pub deadline: Duration,
    /// Callback port; 0 picks an ephemeral port.
    pub callback_port: u16,
    /// Whether to launch the browser at the form.
    pub open_browser: bool,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self::from(&PayloadConfig::default())
    }
}

impl From<&PayloadConfig> for LoginOptions {
    fn from(config: &PayloadConfig) -> Self {
        Self {
            collection: config.login.collection.clone(),
            deadline: Duration::from_secs(config.login.deadline_seconds),
            callback_port: config.login.callback_port,
            open_browser: config.login.open_browser,
        }
    }
}

// ---------------------------------------------------------------------------
// LoginCoordinator
// ---------------------------------------------------------------------------

/// Everything a running attempt needs, owned by its task.
#[derive(Clone)]
struct AttemptContext {
    http: reqwest::Client,
    api_root: String,
    store: Arc<CredentialStore>,
    browser: Arc<dyn BrowserLauncher>,
    options: LoginOptions,
}

/// Single-flight coordinator for interactive logins.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use payload_mcp::auth::login::{LoginCoordinator, LoginOptions};
/// use payload_mcp::auth::store::CredentialStore;
///
/// # async fn example() -> payload_mcp::error::Result<()> {
/// let store = Arc::new(CredentialStore::new());
/// let login = LoginCoordinator::new(
///     reqwest::Client::new(),
///     "http://localhost:3000/api",
///     Arc::clone(&store),
///     LoginOptions::default(),
/// );
/// let session = login.login().await?;
/// assert_eq!(store.get().unwrap().token(), session.token());
/// # Ok(())
/// # }
/// ```
pub struct LoginCoordinator {
    ctx: AttemptContext,
    current: Mutex<Option<watch::Receiver<LoginAttempt>>>,
    attempts: AtomicU64,
}

impl LoginCoordinator {
    /// Creates a coordinator that launches the system browser.
    pub fn new(
        http: reqwest::Client,
        api_root: impl Into<String>,
        store: Arc<CredentialStore>,
        options: LoginOptions,
    ) -> Self {
        Self {
            ctx: AttemptContext {
                http,
                api_root: api_root.into().trim_end_matches('/').to_string(),
                store,
                browser: Arc::new(SystemBrowser),
                options,
            },
            current: Mutex::new(None),
            attempts: AtomicU64::new(0),
        }
    }

    /// Replaces the browser launcher.
    pub fn with_browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.ctx.browser = browser;
        self
    }

    pub fn options(&self) -> &LoginOptions {
        &self.ctx.options
    }

    /// Number of attempts started by this coordinator.
    pub fn attempts_started(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Latest attempt snapshot, if any attempt has been started.
    pub async fn current_attempt(&self) -> Option<LoginAttempt> {
        let current = self.current.lock().await;
        current.as_ref().map(|rx| rx.borrow().clone())
    }

    /// State of the latest attempt, or `Idle` when none was started.
    pub async fn state(&self) -> LoginState {
        self.current_attempt()
            .await
            .map(|a| a.state)
            .unwrap_or(LoginState::Idle)
    }

    /// Joins the in-flight attempt or starts a new one, then waits for its
    /// terminal state.
    ///
    /// # Errors
    ///
    /// Returns `Authentication` when the attempt fails or times out.
    pub async fn login(&self) -> Result<Arc<Session>> {
        let mut rx = self.join_or_start().await;

        let attempt = rx
            .wait_for(|a| a.state.is_terminal())
            .await
            .map(|a| LoginAttempt::clone(&a))
            .map_err(|_| {
                PayloadMcpError::Authentication("login attempt ended unexpectedly".to_string())
            })?;

        match (attempt.state, attempt.session) {
            (LoginState::Succeeded, Some(session)) => Ok(session),
            _ => Err(PayloadMcpError::Authentication(
                attempt
                    .error
                    .unwrap_or_else(|| "login failed".to_string()),
            )
            .into()),
        }
    }

    /// Returns a receiver for the active attempt, starting one if needed.
    ///
    /// Holding the lock across the check and the spawn makes this the only
    /// place an attempt can leave `idle`.
    pub async fn join_or_start(&self) -> watch::Receiver<LoginAttempt> {
        let mut current = self.current.lock().await;

        if let Some(rx) = current.as_ref() {
            let attempt = rx.borrow();
            if !attempt.state.is_terminal() {
                tracing::debug!(attempt = attempt.id, "Joining in-flight login attempt");
                return rx.clone();
            }
        }

        let id = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let deadline = Instant::now() + self.ctx.options.deadline;
        let (tx, rx) = watch::channel(LoginAttempt::new(
            id,
            self.ctx.options.collection.clone(),
            deadline,
        ));

        tracing::info!(attempt = id, "Starting interactive login");
        tokio::spawn(run_attempt(tx, self.ctx.clone()));

        *current = Some(rx.clone());
        rx
    }
}

/// Drives one attempt to a terminal state and publishes it.
async fn run_attempt(tx: watch::Sender<LoginAttempt>, ctx: AttemptContext) {
    let id = tx.borrow().id;
    match drive_attempt(&tx, &ctx).await {
        Ok(session) => {
            tracing::info!(attempt = id, "Interactive login succeeded");
            tx.send_modify(|a| {
                a.state = LoginState::Succeeded;
                a.session = Some(session);
            });
        }
        Err(e) => {
            tracing::error!(attempt = id, "Interactive login failed: {}", e);
            tx.send_modify(|a| {
                a.state = LoginState::Failed;
                a.error = Some(failure_reason(&e));
            });
        }
    }
}

async fn drive_attempt(
    tx: &watch::Sender<LoginAttempt>,
    ctx: &AttemptContext,
) -> Result<Arc<Session>> {
    let deadline = tx.borrow().deadline;
    let (sub_tx, mut sub_rx) = mpsc::channel(4);

    let listener =
        CallbackListener::bind(ctx.options.callback_port, &ctx.options.collection, sub_tx).await?;
    let url = listener.url();
    tx.send_modify(|a| {
        a.state = LoginState::Listening;
        a.callback_url = Some(url.clone());
    });

    if ctx.options.open_browser {
        tracing::info!("Opening browser for Payload login at {}", url);
        if let Err(e) = ctx.browser.open(&url) {
            tracing::warn!("Failed to open browser ({}); open {} manually", e, url);
        }
    } else {
        tracing::info!("Open {} in a browser to log in to Payload", url);
    }
    tx.send_modify(|a| a.state = LoginState::AwaitingSubmission);

    let outcome = match tokio::time::timeout_at(deadline, sub_rx.recv()).await {
        Ok(Some(sub)) => exchange_submission(tx, ctx, sub, deadline).await,
        Ok(None) => Err(PayloadMcpError::Authentication(
            "login callback listener stopped".to_string(),
        )
        .into()),
        Err(_) => Err(timed_out(ctx).into()),
    };
    listener.shutdown().await;
    outcome
}

/// Exchanges submitted credentials and answers the browser with the result.
async fn exchange_submission(
    tx: &watch::Sender<LoginAttempt>,
    ctx: &AttemptContext,
    sub: Submission,
    deadline: Instant,
) -> Result<Arc<Session>> {
    tracing::debug!(collection = %sub.collection, "Login form submitted");
    tx.send_modify(|a| {
        a.state = LoginState::Exchanging;
        a.collection = sub.collection.clone();
    });

    let exchange = exchange_credentials(
        &ctx.http,
        &ctx.api_root,
        &sub.collection,
        &sub.username,
        &sub.password,
    );
    let result = match tokio::time::timeout_at(deadline, exchange).await {
        Ok(result) => result,
        Err(_) => Err(timed_out(ctx).into()),
    };

    match result {
        Ok(session) => {
            let session = Arc::new(session);
            ctx.store.set_shared(Arc::clone(&session));
            let _ = sub.reply.send(SubmissionOutcome::Accepted {
                collection: sub.collection,
            });
            Ok(session)
        }
        Err(e) => {
            let _ = sub.reply.send(SubmissionOutcome::Rejected {
                reason: failure_reason(&e),
            });
            Err(e)
        }
    }
}

fn timed_out(ctx: &AttemptContext) -> PayloadMcpError {
    PayloadMcpError::Authentication(format!(
        "login timed out after {}s",
        ctx.options.deadline.as_secs_f64()
    ))
}

/// Plain reason for a failed attempt, without the error kind prefix.
fn failure_reason(err: &anyhow::Error) -> String {
    match err.downcast_ref::<PayloadMcpError>() {
        Some(PayloadMcpError::Authentication(reason)) => reason.clone(),
        _ => err.to_string(),
    }
}
