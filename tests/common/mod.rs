use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use payload_mcp::auth::{BrowserLauncher, CredentialStore, LoginCoordinator, LoginOptions};
use payload_mcp::auth::{Session, SessionSource};
use payload_mcp::client::{build_http_client, PayloadClient};
use payload_mcp::config::PayloadConfig;

/// HTTP client that never goes through a proxy, for talking to 127.0.0.1.
#[allow(dead_code)]
pub fn local_http() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("failed to build reqwest client")
}

/// Browser stand-in that plays the user: it submits the login form as soon
/// as it is asked to open it.
#[allow(dead_code)]
pub struct FormSubmittingBrowser {
    pub username: String,
    pub password: String,
    pub collection: String,
    pub opened: AtomicUsize,
}

#[allow(dead_code)]
impl FormSubmittingBrowser {
    pub fn new(username: &str, password: &str) -> Arc<Self> {
        Arc::new(Self {
            username: username.to_string(),
            password: password.to_string(),
            collection: String::new(),
            opened: AtomicUsize::new(0),
        })
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl BrowserLauncher for FormSubmittingBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let url = url.to_string();
        let form = vec![
            ("username", self.username.clone()),
            ("password", self.password.clone()),
            ("collection", self.collection.clone()),
        ];
        tokio::spawn(async move {
            let _ = local_http().post(url).form(&form).send().await;
        });
        Ok(())
    }
}

/// Browser stand-in for a user who never submits the form.
#[allow(dead_code)]
#[derive(Default)]
pub struct IdleBrowser {
    pub opened: AtomicUsize,
}

impl BrowserLauncher for IdleBrowser {
    fn open(&self, _url: &str) -> std::io::Result<()> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Browser stand-in that cannot be launched.
#[allow(dead_code)]
pub struct BrokenBrowser;

impl BrowserLauncher for BrokenBrowser {
    fn open(&self, _url: &str) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no browser available",
        ))
    }
}

/// Builds a client against `server` with the given starting token and
/// browser stand-in.
#[allow(dead_code)]
pub fn client_with_browser(
    server: &MockServer,
    token: Option<&str>,
    browser: Arc<dyn BrowserLauncher>,
    deadline: Duration,
) -> PayloadClient {
    let config = PayloadConfig {
        base_url: format!("{}/api", server.uri()),
        ..PayloadConfig::default()
    };
    client_for_config(&config, token, browser, deadline)
}

#[allow(dead_code)]
pub fn client_for_config(
    config: &PayloadConfig,
    token: Option<&str>,
    browser: Arc<dyn BrowserLauncher>,
    deadline: Duration,
) -> PayloadClient {
    let http = build_http_client(config).expect("failed to build http client");
    let store = Arc::new(match token {
        Some(t) => CredentialStore::with_session(Session::new(t, SessionSource::Static)),
        None => CredentialStore::new(),
    });

    let mut options = LoginOptions::from(config);
    options.deadline = deadline;

    let login = Arc::new(
        LoginCoordinator::new(http.clone(), config.api_root(), Arc::clone(&store), options)
            .with_browser(browser),
    );
    PayloadClient::from_parts(http, config.api_root(), store, login)
}

/// Mounts a successful `POST /api/{collection}/login` returning `token`.
#[allow(dead_code)]
pub async fn mount_login(server: &MockServer, collection: &str, token: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(format!("/api/{collection}/login")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Auth Passed",
            "user": { "id": "1", "email": "editor@example.com" },
            "token": token,
            "exp": 4_102_444_800i64
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
