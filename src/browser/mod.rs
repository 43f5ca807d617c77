//! Browser driver.
//!
//! Wraps a Chrome/Chromium session driven over the DevTools protocol
//! (`chromiumoxide`). One session is scoped to one sync run: launch,
//! navigate, wait for selectors with a bounded timeout, read text, click,
//! type, screenshot on failure, and tear the process down on every exit
//! path. `close()` is idempotent and `Drop` aborts the CDP event loop as a
//! backstop, so a crashed run cannot leak a browser process.

pub mod delays;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Element, Page};
use futures::StreamExt;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::browser::delays::Delays;

/// Poll interval while waiting for a selector to appear.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("failed to navigate to {url}")]
    Navigation {
        url: String,
        #[source]
        source: CdpError,
    },

    #[error("element not found: {selector} (waited {waited_secs:.1}s)")]
    ElementNotFound { selector: String, waited_secs: f64 },

    #[error("element {selector} has no readable text")]
    EmptyText { selector: String },

    #[error("failed to capture screenshot: {0}")]
    Screenshot(String),

    #[error("browser protocol error")]
    Cdp(#[from] CdpError),
}

/// Options for launching a session, carved out of the run configuration.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub headless: bool,
    pub delays: Delays,
    pub screenshot_dir: PathBuf,
}

/// A live browser session: the Chrome child process, its CDP event loop, and
/// a single page all adapters drive in turn.
pub struct BrowserSession {
    /// `None` once the session has been closed; guards double-teardown.
    browser: Mutex<Option<Browser>>,
    handler_task: JoinHandle<()>,
    page: Page,
    delays: Delays,
    screenshot_dir: PathBuf,
}

impl BrowserSession {
    /// Launch Chrome and open a blank page.
    pub async fn launch(options: &SessionOptions) -> Result<Self, BrowserError> {
        info!(headless = options.headless, "Launching browser");

        let mut builder = BrowserConfig::builder()
            .window_size(1920, 1080)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // Drive the CDP event stream until the browser goes away.
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = browser.new_page("about:blank").await?;
        info!("Browser started");

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler_task,
            page,
            delays: options.delays,
            screenshot_dir: options.screenshot_dir.clone(),
        })
    }

    /// Navigate the page to `url` and pause for the profile's settle delay.
    pub async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        debug!(url, "Navigating");
        self.page
            .goto(url)
            .await
            .map_err(|source| BrowserError::Navigation {
                url: url.to_string(),
                source,
            })?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|source| BrowserError::Navigation {
                url: url.to_string(),
                source,
            })?;
        self.pause(self.delays.navigate_delay()).await;
        Ok(())
    }

    /// Wait for a selector to appear, polling up to the profile's timeout.
    pub async fn wait_for(&self, selector: &str) -> Result<Element, BrowserError> {
        let timeout = self.delays.wait_timeout();
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            match self.page.find_element(selector).await {
                Ok(element) => return Ok(element),
                Err(_) if tokio::time::Instant::now() < deadline => {
                    tokio::time::sleep(WAIT_POLL_INTERVAL).await;
                }
                Err(_) => {
                    warn!(selector, "Element did not appear before timeout");
                    return Err(BrowserError::ElementNotFound {
                        selector: selector.to_string(),
                        waited_secs: timeout.as_secs_f64(),
                    });
                }
            }
        }
    }

    /// Wait for at least one match of a selector, returning all matches.
    pub async fn wait_for_all(&self, selector: &str) -> Result<Vec<Element>, BrowserError> {
        let timeout = self.delays.wait_timeout();
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            match self.page.find_elements(selector).await {
                Ok(elements) if !elements.is_empty() => return Ok(elements),
                _ if tokio::time::Instant::now() < deadline => {
                    tokio::time::sleep(WAIT_POLL_INTERVAL).await;
                }
                _ => {
                    warn!(selector, "No elements appeared before timeout");
                    return Err(BrowserError::ElementNotFound {
                        selector: selector.to_string(),
                        waited_secs: timeout.as_secs_f64(),
                    });
                }
            }
        }
    }

    /// Wait for a selector and return its trimmed inner text.
    pub async fn read_text(&self, selector: &str) -> Result<String, BrowserError> {
        let element = self.wait_for(selector).await?;
        self.text_of(&element, selector).await
    }

    /// Trimmed inner text of an already-located element.
    pub async fn text_of(
        &self,
        element: &Element,
        selector: &str,
    ) -> Result<String, BrowserError> {
        let text = element
            .inner_text()
            .await?
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(BrowserError::EmptyText {
                selector: selector.to_string(),
            });
        }
        Ok(text)
    }

    /// Click an element, then pause for the profile's action delay.
    pub async fn click(&self, element: &Element) -> Result<(), BrowserError> {
        element.click().await?;
        self.pause(self.delays.action_delay()).await;
        Ok(())
    }

    /// Focus an element and type into it, then pause.
    pub async fn type_text(&self, element: &Element, text: &str) -> Result<(), BrowserError> {
        element.focus().await?;
        element.type_str(text).await?;
        self.pause(self.delays.action_delay()).await;
        Ok(())
    }

    /// Capture a PNG of the current page for post-mortem debugging.
    ///
    /// Used when a scrape fails; the file lands in the configured screenshot
    /// directory as `<label>-<timestamp>.png`.
    pub async fn capture_failure_screenshot(&self, label: &str) -> Result<PathBuf, BrowserError> {
        std::fs::create_dir_all(&self.screenshot_dir)
            .map_err(|e| BrowserError::Screenshot(e.to_string()))?;

        let filename = format!(
            "{label}-{}.png",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        );
        let path = self.screenshot_dir.join(filename);

        let png = self
            .page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
            .map_err(|e| BrowserError::Screenshot(e.to_string()))?;

        std::fs::write(&path, png).map_err(|e| BrowserError::Screenshot(e.to_string()))?;
        info!(path = %path.display(), "Failure screenshot captured");
        Ok(path)
    }

    /// Shut the browser down. Safe to call more than once; later calls are
    /// no-ops. The run must go through here on every exit path so the Chrome
    /// child is reaped deterministically.
    pub async fn close(&self) {
        let browser = self.browser.lock().await.take();
        let Some(mut browser) = browser else {
            debug!("Browser already closed");
            return;
        };

        info!("Stopping browser");
        if let Err(e) = browser.close().await {
            error!(error = %e, "Failed to close browser cleanly");
        }
        if let Err(e) = browser.wait().await {
            error!(error = %e, "Failed to reap browser process");
        }
        self.handler_task.abort();
        info!("Browser stopped");
    }

    /// Whether `close()` has already run.
    pub async fn is_closed(&self) -> bool {
        self.browser.lock().await.is_none()
    }

    pub fn screenshot_dir(&self) -> &Path {
        &self.screenshot_dir
    }

    async fn pause(&self, delay: Duration) {
        debug!(secs = format!("{:.2}", delay.as_secs_f64()), "Pacing delay");
        tokio::time::sleep(delay).await;
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Backstop only: the orchestrator calls close() on all normal paths.
        self.handler_task.abort();
    }
}
