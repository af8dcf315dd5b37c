//! Product detail command: title, price, features and detail tables of one
//! or many product pages.

use super::input::ProductPage;
use super::pause;
use crate::amazon::details::DetailMode;
use crate::config::Config;
use crate::format::{DetailsEntry, Formatter};
use crate::resolver::Resolver;
use crate::session::{self, PageSession};
use anyhow::Result;
use tracing::{info, warn};

/// Reads product details and formats them.
pub struct DetailsCommand {
    config: Config,
    mode: DetailMode,
}

impl DetailsCommand {
    /// Creates a details command using the configured detail mode.
    pub fn new(config: Config) -> Self {
        Self { mode: config.detail_mode, config }
    }

    /// Overrides the detail mode.
    pub fn with_mode(mut self, mode: DetailMode) -> Self {
        self.mode = mode;
        self
    }

    /// Opens a session for the configured backend, reads every page and
    /// returns formatted output.
    pub async fn execute(&self, pages: &[ProductPage]) -> Result<String> {
        self.config.validate()?;

        let session = session::open(&self.config).await?;
        let entries = self.execute_with_session(session, pages).await?;
        Ok(self.format(&entries))
    }

    /// Reads pages with a provided session (for testing). A failed page
    /// becomes an error entry. The session is closed before returning.
    pub async fn execute_with_session<S: PageSession>(
        &self,
        session: S,
        pages: &[ProductPage],
    ) -> Result<Vec<DetailsEntry>> {
        let mut resolver = Resolver::new(session, &self.config);
        let mut entries = Vec::with_capacity(pages.len());

        for (i, page) in pages.iter().enumerate() {
            if i > 0 {
                pause(&self.config).await;
            }

            info!("[{}/{}] Reading {} details of {}", i + 1, pages.len(), self.mode, page.label);
            let outcome = resolver.product_details(&page.url, self.mode).await;
            if let Err(e) = &outcome {
                warn!("Failed to read {}: {:#}", page.label, e);
            }
            entries.push(DetailsEntry::new(page.label.clone(), outcome));
        }

        if let Err(e) = resolver.close().await {
            warn!("Failed to close page session: {}", e);
        }

        Ok(entries)
    }

    /// Formats entries in the configured output format.
    pub fn format(&self, entries: &[DetailsEntry]) -> String {
        Formatter::new(self.config.format, self.config.region).format_details(entries, self.mode)
    }
}
