//! Scripted in-memory page session for tests.

use super::{PageSession, SessionError};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::time::Duration;

/// Serves canned HTML per URL. Clicking the "New" filter swaps the panel
/// page for its filtered version when one is registered.
#[derive(Default)]
pub struct MockSession {
    pages: HashMap<String, String>,
    filtered: HashMap<String, String>,
    current_url: Option<String>,
    current: Option<String>,
    clicks_fail: bool,
    panic_on_navigate: bool,
    navigation_failures: usize,
    pub clicks: Vec<String>,
    pub visited: Vec<String>,
    pub closed: bool,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// HTML served for `url` once the "New" filter is clicked.
    pub fn with_filtered_page(mut self, url: &str, html: &str) -> Self {
        self.filtered.insert(url.to_string(), html.to_string());
        self
    }

    pub fn failing_clicks(mut self) -> Self {
        self.clicks_fail = true;
        self
    }

    /// Fails the next `count` navigations as if the connection dropped.
    pub fn failing_navigations(mut self, count: usize) -> Self {
        self.navigation_failures = count;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_navigate = true;
        self
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PageSession for MockSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        if self.panic_on_navigate {
            panic!("renderer crashed");
        }
        self.visited.push(url.to_string());

        if self.navigation_failures > 0 {
            self.navigation_failures -= 1;
            return Err(SessionError::Navigation {
                url: url.to_string(),
                reason: "connection reset".to_string(),
            });
        }

        let html = self.pages.get(url).cloned().ok_or_else(|| SessionError::Navigation {
            url: url.to_string(),
            reason: "connection refused".to_string(),
        })?;
        self.current_url = Some(url.to_string());
        self.current = Some(html);
        Ok(())
    }

    async fn wait_for_element(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        self.ensure_open()?;
        let parsed = Selector::parse(selector)
            .map_err(|_| SessionError::InvalidSelector(selector.to_string()))?;
        let html = self.current.as_deref().ok_or(SessionError::NoPage)?;

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
        self.current.clone().ok_or(SessionError::NoPage)
    }

    async fn attempt_click(&mut self, selector: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.clicks.push(selector.to_string());
        if self.clicks_fail {
            return Err(SessionError::Browser(format!("no element for '{}'", selector)));
        }

        if selector == crate::amazon::selectors::page::NEW_FILTER {
            let filtered = self.current_url.as_ref().and_then(|url| self.filtered.get(url));
            if let Some(html) = filtered {
                self.current = Some(html.clone());
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.closed = true;
        self.current = None;
        Ok(())
    }
}
