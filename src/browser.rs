//! Headless browser rendering for script-built embed pages.
//!
//! Some sites only inject their player iframe after client-side scripts
//! run, so a static fetch sees nothing. For those, a provider renders the
//! page in headless Chromium and scrapes the resulting DOM.
//!
//! Browser resources are scoped per lookup: [`BrowserSession`] owns the
//! launched browser and releases it exactly once, whether the lookup
//! succeeds, finds nothing, errors, or its future is dropped mid-flight.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::http_client::cancellable;

/// Page navigation bound.
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
/// Extra time given to scripts after load before the DOM is captured.
pub const SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Binaries probed in `PATH` when none is configured.
const CHROMIUM_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

/// A launched browser instance.
#[async_trait]
pub trait Browser: Send {
    /// Load `url` and return the serialized DOM after scripts settle.
    async fn render(&mut self, url: &str, cancel: &CancellationToken) -> Result<String, ProviderError>;

    /// Shut the instance down and free its resources.
    async fn close(&mut self) -> Result<(), ProviderError>;
}

/// Factory for [`Browser`] instances.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Browser>, ProviderError>;
}

/// Scoped ownership of one launched browser.
///
/// The inner handle is taken on the first [`release`](Self::release), so a
/// second release is a no-op. If the session is dropped unreleased (the
/// lookup future was cancelled), the close is handed to the runtime.
pub struct BrowserSession {
    browser: Option<Box<dyn Browser>>,
}

impl BrowserSession {
    pub async fn open(launcher: &dyn BrowserLauncher) -> Result<Self, ProviderError> {
        let browser = launcher.launch().await?;
        Ok(Self { browser: Some(browser) })
    }

    pub async fn render(&mut self, url: &str, cancel: &CancellationToken) -> Result<String, ProviderError> {
        match self.browser.as_mut() {
            Some(browser) => browser.render(url, cancel).await,
            None => Err(ProviderError::Browser("session already released".into())),
        }
    }

    pub async fn release(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "browser close failed");
            }
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let Some(mut browser) = self.browser.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = browser.close().await {
                        warn!(error = %e, "deferred browser close failed");
                    }
                });
            }
            // No runtime left: the browser's own Drop has to clean up.
            Err(_) => drop(browser),
        }
    }
}

/// Render `url` in a fresh session, releasing it on every exit path.
pub async fn render_page(
    launcher: &dyn BrowserLauncher,
    url: &str,
    cancel: &CancellationToken,
) -> Result<String, ProviderError> {
    let mut session = BrowserSession::open(launcher).await?;
    let outcome = session.render(url, cancel).await;
    session.release().await;
    outcome
}

/// Launches headless Chromium with `--dump-dom`.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    binary: PathBuf,
    user_agent: String,
    navigation_timeout: Duration,
    settle_delay: Duration,
}

impl ChromiumLauncher {
    pub fn new(binary: impl Into<PathBuf>, user_agent: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            user_agent: user_agent.into(),
            navigation_timeout: NAVIGATION_TIMEOUT,
            settle_delay: SETTLE_DELAY,
        }
    }

    /// Find a Chromium-family binary in `PATH`.
    pub fn detect(user_agent: impl Into<String>) -> Option<Self> {
        CHROMIUM_CANDIDATES
            .iter()
            .find_map(|name| which::which(name).ok())
            .map(|path| Self::new(path, user_agent))
    }

    #[must_use]
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn binary(&self) -> &std::path::Path {
        &self.binary
    }

    fn args(&self, profile_dir: &std::path::Path, url: &str) -> Vec<String> {
        vec![
            "--headless=new".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--mute-audio".to_string(),
            "--hide-scrollbars".to_string(),
            "--window-size=1280,720".to_string(),
            format!("--user-data-dir={}", profile_dir.display()),
            format!("--user-agent={}", self.user_agent),
            format!("--timeout={}", self.navigation_timeout.as_millis()),
            format!("--virtual-time-budget={}", self.settle_delay.as_millis()),
            "--dump-dom".to_string(),
            url.to_string(),
        ]
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>, ProviderError> {
        let profile_dir = tempfile::Builder::new()
            .prefix("streamfind-chromium-")
            .tempdir()
            .map_err(|e| ProviderError::Browser(format!("failed to create profile dir: {e}")))?;
        debug!(binary = %self.binary.display(), profile = %profile_dir.path().display(), "launching chromium");

        Ok(Box::new(ChromiumBrowser {
            launcher: self.clone(),
            profile_dir: Some(profile_dir),
            child: None,
        }))
    }
}

struct ChromiumBrowser {
    launcher: ChromiumLauncher,
    profile_dir: Option<tempfile::TempDir>,
    child: Option<Child>,
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn render(&mut self, url: &str, cancel: &CancellationToken) -> Result<String, ProviderError> {
        let profile_dir = self
            .profile_dir
            .as_ref()
            .ok_or_else(|| ProviderError::Browser("browser already closed".into()))?;

        let mut child = Command::new(&self.launcher.binary)
            .args(self.launcher.args(profile_dir.path(), url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProviderError::Browser(format!("failed to spawn {}: {e}", self.launcher.binary.display())))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProviderError::Browser("chromium stdout not captured".into()))?;
        self.child = Some(child);

        let budget = self.launcher.navigation_timeout + self.launcher.settle_delay;
        let read = async {
            let mut dom = String::new();
            stdout.read_to_string(&mut dom).await.map(|_| dom)
        };

        let dom = match tokio::time::timeout(budget, cancellable(cancel, read)).await {
            Err(_) => return Err(ProviderError::Timeout(budget.as_secs())),
            Ok(Err(cancelled)) => return Err(cancelled),
            Ok(Ok(Err(e))) => return Err(ProviderError::Browser(format!("reading DOM failed: {e}"))),
            Ok(Ok(Ok(dom))) => dom,
        };

        if let Some(mut child) = self.child.take() {
            let status = child
                .wait()
                .await
                .map_err(|e| ProviderError::Browser(format!("waiting for chromium failed: {e}")))?;
            if !status.success() && dom.trim().is_empty() {
                return Err(ProviderError::Browser(format!("chromium exited with {status}")));
            }
        }

        debug!(bytes = dom.len(), "rendered DOM captured");
        Ok(dom)
    }

    async fn close(&mut self) -> Result<(), ProviderError> {
        if let Some(mut child) = self.child.take() {
            // Already-exited processes report an error here; nothing to do.
            let _ = child.kill().await;
        }
        if let Some(dir) = self.profile_dir.take() {
            dir.close()
                .map_err(|e| ProviderError::Browser(format!("failed to remove profile dir: {e}")))?;
        }
        Ok(())
    }
}
