//! Page-rendering sessions.
//!
//! A session is the single shared navigation state used to load both pages of
//! a product. It is owned exclusively by one resolver and closed explicitly
//! by whoever opened it.

pub mod http;

#[cfg(feature = "browser")]
pub mod chromium;

#[cfg(test)]
pub(crate) mod mock;

use crate::config::{Backend, Config};
use anyhow::Context;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use http::HttpSession;

#[cfg(feature = "browser")]
pub use chromium::ChromiumSession;

/// Failures a page session can report.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("timed out after {timeout_ms}ms waiting for '{selector}'")]
    Timeout { selector: String, timeout_ms: u64 },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("request to {url} failed with status {status}")]
    Http { status: u16, url: String },

    #[error("{0} is not supported by this session")]
    Unsupported(&'static str),

    #[error("invalid selector '{0}'")]
    InvalidSelector(String),

    #[error("no page loaded")]
    NoPage,

    #[error("session is closed")]
    Closed,

    #[error("browser error: {0}")]
    Browser(String),
}

/// Trait for page rendering - enables mocking for tests.
#[async_trait]
pub trait PageSession: Send {
    /// Loads a URL, replacing the current page.
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    /// Waits until an element matching the CSS selector is present.
    async fn wait_for_element(&mut self, selector: &str, timeout: Duration)
        -> Result<(), SessionError>;

    /// Returns the current page HTML.
    async fn current_html(&mut self) -> Result<String, SessionError>;

    /// Clicks the first element matching the selector. Callers treat failure
    /// as non-fatal.
    async fn attempt_click(&mut self, selector: &str) -> Result<(), SessionError>;

    /// Releases the session. Further calls fail with `SessionError::Closed`.
    async fn close(&mut self) -> Result<(), SessionError>;
}

#[async_trait]
impl<S: PageSession + ?Sized> PageSession for Box<S> {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        (**self).navigate(url).await
    }

    async fn wait_for_element(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        (**self).wait_for_element(selector, timeout).await
    }

    async fn current_html(&mut self) -> Result<String, SessionError> {
        (**self).current_html().await
    }

    async fn attempt_click(&mut self, selector: &str) -> Result<(), SessionError> {
        (**self).attempt_click(selector).await
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        (**self).close().await
    }
}

/// Opens a session for the configured backend.
pub async fn open(config: &Config) -> anyhow::Result<Box<dyn PageSession>> {
    match config.backend {
        Backend::Http => {
            let session = HttpSession::new(config).context("Failed to create HTTP session")?;
            Ok(Box::new(session))
        }
        Backend::Chromium => open_chromium(config).await,
    }
}

#[cfg(feature = "browser")]
async fn open_chromium(config: &Config) -> anyhow::Result<Box<dyn PageSession>> {
    let session =
        ChromiumSession::launch(config).await.context("Failed to start Chromium session")?;
    Ok(Box::new(session))
}

#[cfg(not(feature = "browser"))]
async fn open_chromium(_config: &Config) -> anyhow::Result<Box<dyn PageSession>> {
    anyhow::bail!("The chromium backend requires building with `--features browser`")
}
