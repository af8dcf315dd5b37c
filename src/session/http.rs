//! Plain HTTP page session using wreq for TLS fingerprint emulation.
//!
//! Pages are fetched once and never re-rendered, so element waits resolve
//! immediately against the fetched HTML and clicks are unsupported. The
//! resolver's filter step degrades to parsing the unfiltered panel.

use super::{PageSession, SessionError};
use crate::amazon::regions::Region;
use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};
use wreq::Client;
use wreq_util::Emulation;

/// HTTP-only page session with browser impersonation.
pub struct HttpSession {
    client: Client,
    region: Region,
    page: Option<String>,
    closed: bool,
}

impl HttpSession {
    /// Creates a new session with the given configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_millis(config.container_timeout_ms.max(1000)))
            .connect_timeout(Duration::from_secs(10));

        // Configure proxy if specified
        if let Some(proxy_url) = &config.proxy {
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url).context("Failed to configure proxy")?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self { client, region: config.region, page: None, closed: false })
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, SessionError> {
        debug!("GET {}", url);

        let navigation_error =
            |e: wreq::Error| SessionError::Navigation { url: url.to_string(), reason: e.to_string() };

        let response = self
            .client
            .get(url)
            .emulation(Emulation::Chrome131)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8")
            .header("Accept-Language", self.region.accept_language())
            .header("Accept-Encoding", "gzip, deflate, br")
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none")
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await
            .map_err(navigation_error)?;

        let status = response.status();
        debug!("Response status: {}", status);

        if status == 503 {
            warn!("Rate limited (503). Consider using a proxy or increasing delay.");
        }

        if !status.is_success() {
            return Err(SessionError::Http { status: status.as_u16(), url: url.to_string() });
        }

        let final_url = response.uri().to_string();
        if !final_url.contains(self.region.domain()) && url.contains(self.region.domain()) {
            warn!(
                "Redirected to different domain: {}. Your IP may be associated with a different region.",
                final_url
            );
        }

        response.text().await.map_err(navigation_error)
    }
}

#[async_trait]
impl PageSession for HttpSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.page = None;
        let html = self.fetch(url).await?;
        self.page = Some(html);
        Ok(())
    }

    async fn wait_for_element(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        self.ensure_open()?;
        let parsed =
            Selector::parse(selector).map_err(|_| SessionError::InvalidSelector(selector.to_string()))?;
        let html = self.page.as_deref().ok_or(SessionError::NoPage)?;

        // A fetched document never changes, so there is nothing to wait for.
        if Html::parse_document(html).select(&parsed).next().is_some() {
            Ok(())
        } else {
            Err(SessionError::Timeout {
                selector: selector.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }

    async fn current_html(&mut self) -> Result<String, SessionError> {
        self.ensure_open()?;
        self.page.clone().ok_or(SessionError::NoPage)
    }

    async fn attempt_click(&mut self, _selector: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        Err(SessionError::Unsupported("click"))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.page = None;
        self.closed = true;
        Ok(())
    }
}
