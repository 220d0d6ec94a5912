//! Browser-driven session for JS-rendered listing and modal pages.
//!
//! The portal renders both the listing anchors and the modal tables fully
//! client-side, so a plain GET sees an empty shell. Each session owns one
//! page; concurrent workers each launch their own session - a session is
//! never shared across tasks.

#[cfg(feature = "browser")]
use std::time::Duration;

use anyhow::Result;
#[cfg(feature = "browser")]
use anyhow::Context;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;

/// Headless browser session exposing navigate-and-wait.
#[cfg(feature = "browser")]
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: tokio::task::JoinHandle<()>,
}

#[cfg(feature = "browser")]
impl BrowserSession {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    /// Launch a headless browser and open a blank page.
    pub async fn launch() -> Result<Self> {
        let chrome_path = Self::find_chrome()?;
        info!("Launching browser from {}", chrome_path);

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to open page")?;

        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    /// Find a Chrome/Chromium executable.
    fn find_chrome() -> Result<String> {
        for path in Self::CHROME_PATHS {
            if std::path::Path::new(path).exists() {
                return Ok(path.to_string());
            }
        }

        for cmd in &["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        return Ok(path);
                    }
                }
            }
        }

        Err(anyhow::anyhow!(
            "Chrome/Chromium not found. Install it (e.g. apt install chromium-browser)"
        ))
    }

    /// Navigate to `url` and block until `selector` matches in the rendered
    /// DOM, up to `wait`. Returns the page HTML, or `None` on wait timeout -
    /// a timeout means "no data here", not an error.
    pub async fn goto_and_wait(
        &self,
        url: &str,
        selector: &str,
        wait: Duration,
    ) -> Result<Option<String>> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("Navigation failed for {}", url))?;

        let appeared = tokio::time::timeout(wait, async {
            loop {
                if self.page.find_element(selector).await.is_ok() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        })
        .await
        .is_ok();

        if !appeared {
            warn!("Timeout: no element matching '{}' at {}", selector, url);
            return Ok(None);
        }

        debug!("Selector '{}' rendered at {}", selector, url);
        let content = self.page.content().await?;
        Ok(Some(content))
    }

    /// Close the browser and stop the CDP handler task.
    pub async fn close(mut self) {
        let _ = self.browser.close().await;
        self.handler.abort();
    }
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
pub struct BrowserSession;

#[cfg(not(feature = "browser"))]
impl BrowserSession {
    pub async fn launch() -> Result<Self> {
        Err(anyhow::anyhow!(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
        ))
    }

    pub async fn goto_and_wait(
        &self,
        _url: &str,
        _selector: &str,
        _wait: std::time::Duration,
    ) -> Result<Option<String>> {
        Err(anyhow::anyhow!(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
        ))
    }

    pub async fn close(self) {}
}
