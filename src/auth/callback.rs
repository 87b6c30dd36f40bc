//! Local HTTP listener that serves the login form
//!
//! The listener binds `127.0.0.1`, serves the form on `GET /` and accepts
//! submissions on `POST /` (and `POST /login`). Each valid submission is
//! forwarded to the login attempt that owns the listener, which answers with
//! the page to render. The [`CallbackListener`] guard owns the server task and
//! releases the port when it is shut down or dropped.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{PayloadMcpError, Result};

/// Time allowed for in-flight responses before the server task is aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// A form submission forwarded to the owning login attempt.
pub struct Submission {
    pub username: String,
    pub password: String,
    pub collection: String,
    /// Receives the page outcome for the browser.
    pub reply: oneshot::Sender<SubmissionOutcome>,
}

impl std::fmt::Debug for Submission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Submission")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("collection", &self.collection)
            .finish()
    }
}

/// Result of handling a submission, rendered back to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Login succeeded; carries the collection that was used.
    Accepted { collection: String },
    /// Login failed; carries the plain-text reason.
    Rejected { reason: String },
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    collection: String,
}

struct CallbackState {
    default_collection: String,
    submissions: mpsc::Sender<Submission>,
}

/// Guard owning the bound callback server.
///
/// Dropping the guard aborts the server task, which releases the port.
/// [`CallbackListener::shutdown`] additionally waits for the task to finish.
pub struct CallbackListener {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl CallbackListener {
    /// Binds `127.0.0.1:{port}` (0 picks an ephemeral port) and starts serving.
    ///
    /// # Errors
    ///
    /// Returns `Authentication` when the port cannot be bound.
    pub async fn bind(
        port: u16,
        default_collection: &str,
        submissions: mpsc::Sender<Submission>,
    ) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|e| {
                PayloadMcpError::Authentication(format!(
                    "failed to bind login callback listener on port {port}: {e}"
                ))
            })?;
        let addr = listener.local_addr()?;

        let app = router(default_collection, submissions);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                tracing::warn!("Login callback server error: {}", e);
            }
        });

        tracing::debug!(addr = %addr, "Login callback listener bound");
        Ok(Self {
            addr,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// URL of the login form.
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Stops the server and waits until the port is released.
    ///
    /// In-flight responses get a short grace period before the task is
    /// aborted.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                task.abort();
                let _ = task.await;
            }
        }
        tracing::debug!(addr = %self.addr, "Login callback listener stopped");
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn router(default_collection: &str, submissions: mpsc::Sender<Submission>) -> Router {
    let state = Arc::new(CallbackState {
        default_collection: default_collection.to_string(),
        submissions,
    });
    Router::new()
        .route("/", get(login_form).post(submit_login))
        .route("/login", get(login_form).post(submit_login))
        .with_state(state)
}

async fn login_form(State(state): State<Arc<CallbackState>>) -> Html<String> {
    Html(render_form(&state.default_collection, None))
}

async fn submit_login(
    State(state): State<Arc<CallbackState>>,
    Form(form): Form<LoginForm>,
) -> Response {
    let username = form.username.trim().to_string();
    if username.is_empty() || form.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Html(render_form(
                &state.default_collection,
                Some("Username and password are required."),
            )),
        )
            .into_response();
    }

    let collection = match form.collection.trim() {
        "" => state.default_collection.clone(),
        c => c.to_string(),
    };

    let (reply_tx, reply_rx) = oneshot::channel();
    let submission = Submission {
        username,
        password: form.password,
        collection,
        reply: reply_tx,
    };

    if state.submissions.send(submission).await.is_err() {
        return (
            StatusCode::GONE,
            Html(render_result(false, "This login attempt is no longer active.")),
        )
            .into_response();
    }

    match reply_rx.await {
        Ok(SubmissionOutcome::Accepted { collection }) => Html(render_result(
            true,
            &format!("Logged in to the '{collection}' collection. You can close this window."),
        ))
        .into_response(),
        Ok(SubmissionOutcome::Rejected { reason }) => {
            (StatusCode::UNAUTHORIZED, Html(render_result(false, &reason))).into_response()
        }
        Err(_) => (
            StatusCode::GONE,
            Html(render_result(false, "This login attempt is no longer active.")),
        )
            .into_response(),
    }
}

fn render_form(default_collection: &str, error: Option<&str>) -> String {
    let error_html = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape_html(e)))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Payload CMS Login</title>
<style>
body {{ font-family: sans-serif; max-width: 420px; margin: 60px auto; }}
label {{ display: block; margin-top: 12px; }}
input {{ width: 100%; padding: 8px; box-sizing: border-box; }}
button {{ margin-top: 20px; padding: 10px 16px; }}
.error {{ color: #b00020; }}
</style>
</head>
<body>
<h1>Payload CMS Login</h1>
{error_html}
<form method="post" action="/">
<label for="username">Email</label>
<input type="text" id="username" name="username" autocomplete="username" required>
<label for="password">Password</label>
<input type="password" id="password" name="password" autocomplete="current-password" required>
<label for="collection">Collection</label>
<input type="text" id="collection" name="collection" value="{collection}">
<button type="submit">Log in</button>
</form>
</body>
</html>
"#,
        collection = escape_html(default_collection),
    )
}

fn render_result(success: bool, message: &str) -> String {
    let title = if success {
        "Login successful"
    } else {
        "Login failed"
    };
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n<p>{}</p>\n</body>\n</html>\n",
        escape_html(message)
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
