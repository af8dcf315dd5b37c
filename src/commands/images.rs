//! Image URL command: high-resolution product images of one or many pages.

use super::input::ProductPage;
use super::pause;
use crate::config::Config;
use crate::format::{Formatter, ImagesEntry};
use crate::resolver::Resolver;
use crate::session::{self, PageSession};
use anyhow::Result;
use tracing::{info, warn};

/// Collects product image URLs and formats them.
pub struct ImagesCommand {
    config: Config,
}

impl ImagesCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Opens a session for the configured backend, reads every page and
    /// returns formatted output.
    pub async fn execute(&self, pages: &[ProductPage]) -> Result<String> {
        self.config.validate()?;

        let session = session::open(&self.config).await?;
        let entries = self.execute_with_session(session, pages).await?;
        Ok(self.format(&entries))
    }

    /// Reads pages with a provided session (for testing). The session is
    /// closed before returning.
    pub async fn execute_with_session<S: PageSession>(
        &self,
        session: S,
        pages: &[ProductPage],
    ) -> Result<Vec<ImagesEntry>> {
        let mut resolver = Resolver::new(session, &self.config);
        let mut entries = Vec::with_capacity(pages.len());

        for (i, page) in pages.iter().enumerate() {
            if i > 0 {
                pause(&self.config).await;
            }

            info!("[{}/{}] Collecting images of {}", i + 1, pages.len(), page.label);
            let outcome = resolver.image_urls(&page.url).await;
            match &outcome {
                Ok(urls) => info!("[{}/{}] {} images", i + 1, pages.len(), urls.len()),
                Err(e) => warn!("Failed to read {}: {:#}", page.label, e),
            }
            entries.push(ImagesEntry::new(page.label.clone(), outcome));
        }

        if let Err(e) = resolver.close().await {
            warn!("Failed to close page session: {}", e);
        }

        Ok(entries)
    }

    /// Formats entries in the configured output format.
    pub fn format(&self, entries: &[ImagesEntry]) -> String {
        Formatter::new(self.config.format, self.config.region).format_images(entries)
    }
}
