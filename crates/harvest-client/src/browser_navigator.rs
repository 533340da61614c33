use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use harvest_core::config::{PaginationConfig, WaitCondition};
use harvest_core::error::AppError;
use harvest_core::traits::{PageNavigator, RenderedPage};
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How long to wait for a `wait_for` selector before reading the DOM anyway.
const SELECTOR_WAIT: Duration = Duration::from_secs(15);

/// Headless-Chromium navigator for script-rendered listings.
///
/// A single browser process is shared across clones; every [`open`] call
/// uses a fresh tab, applies the configured wait conditions, snapshots the
/// rendered DOM, then closes the tab.
///
/// [`open`]: PageNavigator::open
#[derive(Clone)]
pub struct BrowserNavigator {
    browser: Arc<Browser>,
    timeout: Duration,
    wait_for: Option<WaitCondition>,
    next_button: Option<(String, Duration)>,
}

impl BrowserNavigator {
    /// Launch Chromium with a 30 s navigation timeout.
    pub async fn launch(user_agent: &str) -> Result<Self, AppError> {
        Self::launch_with_timeout(user_agent, Duration::from_secs(30)).await
    }

    pub async fn launch_with_timeout(user_agent: &str, timeout: Duration) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();

        if let Some(bin) = find_chrome_binary() {
            tracing::info!(binary = %bin.display(), "Using Chrome binary");
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--no-first-run")
            .arg(format!("--user-agent={user_agent}"))
            .build()
            .map_err(|e| AppError::BrowserError(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled for the connection to make progress.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!(error = %e, "Browser CDP handler error");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            timeout,
            wait_for: None,
            next_button: None,
        })
    }

    /// Condition to satisfy after each navigation, from the pattern document.
    pub fn with_wait_for(mut self, wait_for: Option<WaitCondition>) -> Self {
        self.wait_for = wait_for;
        self
    }

    /// Also wait (bounded) for the next-page control so the next-page check
    /// sees its final state.
    pub fn with_pagination(mut self, pagination: &PaginationConfig) -> Self {
        self.next_button = pagination.next_button_selector.clone().map(|selector| {
            (
                selector,
                Duration::from_millis(pagination.next_button_timeout_ms),
            )
        });
        self
    }

    async fn render(&self, page: &Page, url: &str) -> Result<String, AppError> {
        page.goto(url)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to navigate to {url}: {e}")))?;

        match &self.wait_for {
            Some(WaitCondition::Selector(selector)) => {
                if !wait_for_selector(page, selector, SELECTOR_WAIT).await {
                    tracing::warn!(%url, %selector, "Wait selector never appeared; reading page anyway");
                }
            }
            Some(WaitCondition::Timeout(ms)) => tokio::time::sleep(Duration::from_millis(*ms)).await,
            None => {
                page.find_element("body")
                    .await
                    .map_err(|e| AppError::BrowserError(format!("Page did not render body: {e}")))?;
            }
        }

        if let Some((selector, limit)) = &self.next_button {
            if !wait_for_selector(page, selector, *limit).await {
                tracing::debug!(%url, %selector, "Next-page control not rendered");
            }
        }

        page.content()
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to read page content: {e}")))
    }
}

/// Run `work` bounded by `limit`, then `cleanup` whatever the outcome,
/// including a timeout that drops `work` half way.
async fn bounded_then_cleanup<T>(
    limit: Duration,
    work: impl Future<Output = Result<T, AppError>>,
    cleanup: impl Future<Output = ()>,
) -> Result<T, AppError> {
    let outcome = tokio::time::timeout(limit, work).await;
    cleanup.await;
    outcome.map_err(|_| AppError::Timeout(limit.as_secs()))?
}

async fn wait_for_selector(page: &Page, selector: &str, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    loop {
        if page.find_element(selector).await.is_ok() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Locate a real Chrome/Chromium binary.
///
/// The snap wrapper at `/snap/bin/chromium` drops unknown flags and breaks
/// headless mode, so the binary inside the snap is preferred. `CHROME_BIN`
/// overrides everything. `None` leaves the lookup to chromiumoxide.
fn find_chrome_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(path);
        }
    }

    [
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ]
    .iter()
    .map(PathBuf::from)
    .find(|p| p.exists())
}

impl PageNavigator for BrowserNavigator {
    async fn open(&self, url: &str) -> Result<RenderedPage, AppError> {
        let page = tokio::time::timeout(self.timeout, self.browser.new_page("about:blank"))
            .await
            .map_err(|_| AppError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| AppError::BrowserError(format!("Failed to open tab: {e}")))?;

        let tab = page.clone();
        let close = async move {
            if let Err(e) = tab.close().await {
                tracing::debug!(error = %e, "Failed to close tab");
            }
        };
        let html = bounded_then_cleanup(self.timeout, self.render(&page, url), close).await?;
        Ok(RenderedPage {
            url: url.to_string(),
            html,
        })
    }
}
