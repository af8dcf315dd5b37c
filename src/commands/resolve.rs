//! Product resolution command: one or many products, one after another.

use super::input::ProductPair;
use super::pause;
use crate::config::Config;
use crate::format::{Formatter, Resolution};
use crate::resolver::Resolver;
use crate::session::{self, PageSession};
use anyhow::Result;
use tracing::{info, warn};

/// Resolves product pairs and formats the results.
pub struct ResolveCommand {
    config: Config,
}

impl ResolveCommand {
    /// Creates a new resolve command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Opens a session for the configured backend, resolves every pair and
    /// returns formatted output.
    pub async fn execute(&self, pairs: &[ProductPair]) -> Result<String> {
        self.config.validate()?;

        let session = session::open(&self.config).await?;
        let resolutions = self.execute_with_session(session, pairs).await?;
        Ok(self.format(&resolutions))
    }

    /// Resolves pairs with a provided session (for testing). The session is
    /// closed before returning.
    pub async fn execute_with_session<S: PageSession>(
        &self,
        session: S,
        pairs: &[ProductPair],
    ) -> Result<Vec<Resolution>> {
        let band = self.config.band();
        let mut resolver = Resolver::new(session, &self.config);
        let mut resolutions = Vec::with_capacity(pairs.len());

        for (i, pair) in pairs.iter().enumerate() {
            if i > 0 {
                pause(&self.config).await;
            }

            info!("[{}/{}] Resolving {}", i + 1, pairs.len(), pair.label);
            let result = resolver.resolve(&pair.main_url, &pair.panel_url, band).await;
            if result.is_success() {
                info!(
                    "[{}/{}] {} offers, optimal {:?}",
                    i + 1,
                    pairs.len(),
                    result.total_offers,
                    result.optimal.as_ref().map(|o| o.total)
                );
            }
            resolutions.push(Resolution::new(pair.label.clone(), result));
        }

        if let Err(e) = resolver.close().await {
            warn!("Failed to close page session: {}", e);
        }

        Ok(resolutions)
    }

    /// Formats resolutions in the configured output format.
    pub fn format(&self, resolutions: &[Resolution]) -> String {
        let formatter = Formatter::new(self.config.format, self.config.region);
        match resolutions {
            [single] => formatter.format_one(single),
            _ => formatter.format_all(resolutions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amazon::models::Status;
    use crate::amazon::regions::Region;
    use crate::config::OutputFormat;
    use crate::format::{COLUMN_COUNT, ERROR_SENTINEL};
    use crate::session::mock::MockSession;

    fn make_test_config() -> Config {
        Config {
            delay_ms: 0,
            delay_jitter_ms: 0,
            settle_ms: 0,
            container_timeout_ms: 100,
            filter_timeout_ms: 100,
            ..Config::default()
        }
    }

    fn main_page(price: &str) -> String {
        format!(
            r#"<html><body><div id="dp-container">
                <div id="corePrice_feature_div"><span class="a-price"><span class="a-offscreen">{}</span></span></div>
                <div id="availability"><span>在庫あり。</span></div>
                <div id="merchantInfoFeature_feature_div"><span class="offer-display-feature-text-message">Main Shop</span></div>
                <div id="fulfillerInfoFeature_feature_div"><span class="offer-display-feature-text-message">Amazon</span></div>
            </div></body></html>"#,
            price
        )
    }

    fn panel_page(prices: &[u64]) -> String {
        let entries: String = prices
            .iter()
            .enumerate()
            .map(|(i, price)| {
                format!(
                    r#"<div id="aod-offer">
                        <div id="aod-offer-heading"><span class="a-text-bold">新品</span></div>
                        <div id="aod-offer-price"><span class="aok-offscreen">￥{}</span></div>
                        <div id="aod-offer-shipsFrom"><span class="a-size-small a-color-base">Shop {}</span></div>
                        <div id="aod-offer-soldBy"><a href="/s">Shop {}</a></div>
                    </div>"#,
                    price, i, i
                )
            })
            .collect();
        format!(r#"<html><body><div id="aod-container">{}</div></body></html>"#, entries)
    }

    fn asin_session(asins: &[&str]) -> (MockSession, Vec<ProductPair>) {
        let mut session = MockSession::new();
        let mut pairs = Vec::new();
        for asin in asins {
            let pair = ProductPair::from_asin(asin, Region::Jp).unwrap();
            session = session
                .with_page(&pair.main_url, &main_page("￥1,000"))
                .with_page(&pair.panel_url, &panel_page(&[1000, 1100, 1200]));
            pairs.push(pair);
        }
        (session, pairs)
    }

    #[tokio::test]
    async fn test_resolves_pairs_in_order() {
        let (session, pairs) = asin_session(&["B0TEST0001", "B0TEST0002"]);
        let cmd = ResolveCommand::new(make_test_config());

        let resolutions = cmd.execute_with_session(session, &pairs).await.unwrap();
        assert_eq!(resolutions.len(), 2);
        assert_eq!(resolutions[0].label, "B0TEST0001");
        assert_eq!(resolutions[1].label, "B0TEST0002");
        assert!(resolutions.iter().all(|r| r.result.is_success()));
        assert_eq!(resolutions[0].result.optimal.as_ref().unwrap().total, 1000);
    }

    #[tokio::test]
    async fn test_failed_product_does_not_stop_batch() {
        let (session, mut pairs) = asin_session(&["B0TEST0001"]);
        pairs.insert(0, ProductPair::from_asin("B0MISSING1", Region::Jp).unwrap());
        let cmd = ResolveCommand::new(make_test_config());

        let resolutions = cmd.execute_with_session(session, &pairs).await.unwrap();
        assert_eq!(resolutions[0].result.status, Status::Error);
        assert_eq!(resolutions[1].result.status, Status::Success);
    }

    #[tokio::test]
    async fn test_csv_output_rows() {
        let (session, pairs) = asin_session(&["B0TEST0001"]);
        let mut config = make_test_config();
        config.format = OutputFormat::Csv;
        let cmd = ResolveCommand::new(config);

        let mut all = pairs.clone();
        all.push(ProductPair::from_asin("B0MISSING1", Region::Jp).unwrap());
        let resolutions = cmd.execute_with_session(session, &all).await.unwrap();
        let output = cmd.format(&resolutions);
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("B0TEST0001,1000,New,Amazon,Main Shop,sufficient"));
        assert!(lines[2].starts_with(&format!("B0MISSING1,{}", ERROR_SENTINEL)));
        assert!(lines.iter().all(|l| l.split(',').count() == COLUMN_COUNT + 1));
    }

    #[tokio::test]
    async fn test_json_single_output() {
        let (session, pairs) = asin_session(&["B0TEST0001"]);
        let mut config = make_test_config();
        config.format = OutputFormat::Json;
        let cmd = ResolveCommand::new(config);

        let resolutions = cmd.execute_with_session(session, &pairs).await.unwrap();
        let output = cmd.format(&resolutions);

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["label"], "B0TEST0001");
        assert_eq!(value["result"]["effective_sellers_count"], 4);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let cmd = ResolveCommand::new(make_test_config());
        let resolutions = cmd.execute_with_session(MockSession::new(), &[]).await.unwrap();
        assert!(resolutions.is_empty());
        assert_eq!(cmd.format(&resolutions), "No products resolved.");
    }

    #[tokio::test]
    async fn test_invalid_band_is_rejected() {
        let config = Config { lower_multiplier: 2.0, upper_multiplier: 1.0, ..make_test_config() };
        let cmd = ResolveCommand::new(config);
        assert!(cmd.execute(&[]).await.is_err());
    }

    #[cfg(not(feature = "browser"))]
    #[tokio::test]
    async fn test_chromium_backend_needs_feature() {
        let config = Config { backend: crate::config::Backend::Chromium, ..make_test_config() };
        let err = ResolveCommand::new(config).execute(&[]).await.unwrap_err();
        assert!(err.to_string().contains("--features browser"));
    }
}
