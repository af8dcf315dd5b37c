//! Headless Chromium page session using chromiumoxide.
//!
//! Unlike the HTTP session this one renders JavaScript, so element waits poll
//! the live DOM and the offer panel's "New" filter can actually be clicked.

use super::{PageSession, SessionError};
use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Chromium-backed page session owning one browser and one tab.
pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
    navigation_timeout: Duration,
}

impl ChromiumSession {
    /// Launches Chromium and opens a blank tab.
    pub async fn launch(config: &Config) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg(format!("--accept-lang={}", config.region.accept_language()));

        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(proxy_url) = &config.proxy {
            debug!("Configuring proxy: {}", proxy_url);
            builder = builder.arg(format!("--proxy-server={}", proxy_url));
        }

        let browser_config =
            builder.build().map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        info!("Launching Chromium (headless: {})", config.headless);
        let (browser, mut handler) =
            Browser::launch(browser_config).await.context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await.context("failed to open a tab")?;

        Ok(Self {
            browser: Some(browser),
            page: Some(page),
            handler: Some(handler),
            navigation_timeout: Duration::from_millis(config.container_timeout_ms),
        })
    }

    fn page(&self) -> Result<&Page, SessionError> {
        self.page.as_ref().ok_or(SessionError::Closed)
    }
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        let page = self.page()?;
        debug!("Navigating to {}", url);

        match tokio::time::timeout(self.navigation_timeout, page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => {
                Err(SessionError::Navigation { url: url.to_string(), reason: e.to_string() })
            }
            Err(_) => Err(SessionError::Navigation {
                url: url.to_string(),
                reason: format!("timed out after {}ms", self.navigation_timeout.as_millis()),
            }),
        }
    }

    async fn wait_for_element(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        let page = self.page()?;
        let deadline = Instant::now() + timeout;

        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SessionError::Timeout {
                    selector: selector.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn current_html(&mut self) -> Result<String, SessionError> {
        self.page()?.content().await.map_err(|e| SessionError::Browser(e.to_string()))
    }

    async fn attempt_click(&mut self, selector: &str) -> Result<(), SessionError> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|e| SessionError::Browser(e.to_string()))?;
        element.click().await.map_err(|e| SessionError::Browser(e.to_string()))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.page = None;
        if let Some(mut browser) = self.browser.take() {
            browser.close().await.map_err(|e| SessionError::Browser(e.to_string()))?;
            let _ = browser.wait().await;
        }
        if let Some(handler) = self.handler.take() {
            let _ = handler.await;
        }
        info!("Chromium session closed");
        Ok(())
    }
}
