//! Per-product resolution: load both pages, extract, aggregate.
//!
//! The resolver owns the page session for its whole lifetime. Products are
//! resolved strictly one at a time because both page loads share the
//! session's navigation state.

use crate::amazon::details::{DetailMode, ProductDetails};
use crate::amazon::markers::Markers;
use crate::amazon::models::{Offer, ProductResult};
use crate::amazon::parser::Parser;
use crate::amazon::selectors::page;
use crate::config::Config;
use crate::pricing::{aggregate, BandMultipliers};
use crate::session::{PageSession, SessionError};
use anyhow::{anyhow, bail, Context, Result};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Resolves products against one exclusively owned page session.
pub struct Resolver<S: PageSession> {
    session: S,
    parser: Parser,
    markers: &'static Markers,
    container_timeout: Duration,
    filter_timeout: Duration,
    settle: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl<S: PageSession> Resolver<S> {
    pub fn new(session: S, config: &Config) -> Self {
        Self {
            session,
            parser: Parser::new(config.region),
            markers: config.region.markers(),
            container_timeout: config.container_timeout(),
            filter_timeout: config.filter_timeout(),
            settle: config.settle(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        }
    }

    /// Resolves one product. Never fails: page-load failures, block pages and
    /// panics all come back as an error result.
    pub async fn resolve(
        &mut self,
        main_url: &str,
        panel_url: &str,
        band: BandMultipliers,
    ) -> ProductResult {
        match guard(self.try_resolve(main_url, panel_url, band)).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Failed to resolve {}: {:#}", main_url, e);
                ProductResult::error(format!("{:#}", e))
            }
        }
    }

    /// Reads title, price, features and attribute tables from a product page.
    /// The page load is retried with exponential backoff.
    pub async fn product_details(&mut self, url: &str, mode: DetailMode) -> Result<ProductDetails> {
        guard(async {
            let html = self.load_product_page(url).await?;
            let details = self.parser.parse_details(&html, url, mode);
            debug!("Read {} attributes from {}", details.attributes.len(), url);
            Ok(details)
        })
        .await
    }

    /// Collects up to ten high-resolution image URLs from a product page.
    pub async fn image_urls(&mut self, url: &str) -> Result<Vec<String>> {
        guard(async {
            let html = self.load_product_page(url).await?;
            let urls = self.parser.parse_image_urls(&html);
            if urls.is_empty() {
                warn!("No product images found at {}", url);
            }
            Ok(urls)
        })
        .await
    }

    async fn try_resolve(
        &mut self,
        main_url: &str,
        panel_url: &str,
        band: BandMultipliers,
    ) -> Result<ProductResult> {
        info!("Loading product page: {}", main_url);
        let main_html = self.load(main_url, page::PRODUCT_CONTAINER).await?;
        let buy_box = self.parser.parse_buy_box(&main_html);
        debug!(
            "Buy-box: price {:?}, shipper '{}', stock {}",
            buy_box.offer.price, buy_box.offer.shipper, buy_box.real_stock
        );

        info!("Loading offers panel: {}", panel_url);
        let panel_offers = self.panel_offers(panel_url).await?;
        debug!("Found {} new offers in the panel", panel_offers.len());

        Ok(aggregate(buy_box, panel_offers, self.markers, band))
    }

    async fn load_product_page(&mut self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.load(url, page::PRODUCT_CONTAINER).await {
                Ok(html) => return Ok(html),
                Err(e) if attempt < self.max_retries => {
                    let backoff = self.retry_delay.saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    warn!(
                        "Attempt {}/{} for {} failed ({:#}), retrying in {}ms",
                        attempt,
                        self.max_retries.saturating_add(1),
                        url,
                        e,
                        backoff.as_millis()
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Navigates, waits for the container, and returns the page HTML.
    async fn load(&mut self, url: &str, container: &str) -> Result<String> {
        self.session.navigate(url).await.with_context(|| format!("Failed to load {}", url))?;
        self.session
            .wait_for_element(container, self.container_timeout)
            .await
            .with_context(|| format!("Page {} did not render", url))?;

        let html = self.session.current_html().await.context("Failed to read page HTML")?;
        if let Some(block) = self.parser.detect_block(&html) {
            bail!("Blocked by {} at {}", block, url);
        }
        Ok(html)
    }

    async fn panel_offers(&mut self, panel_url: &str) -> Result<Vec<Offer>> {
        self.load(panel_url, page::PANEL_CONTAINER).await?;

        if let Err(e) = self.apply_new_filter().await {
            warn!("New filter not applied ({}), parsing the panel as rendered", e);
        }

        let html = self.session.current_html().await.context("Failed to read panel HTML")?;
        if let Some(block) = self.parser.detect_block(&html) {
            bail!("Blocked by {} at {}", block, panel_url);
        }
        Ok(self.parser.parse_panel_offers(&html))
    }

    /// Opens the filter drawer and selects "New". Best effort.
    async fn apply_new_filter(&mut self) -> Result<(), SessionError> {
        self.session.attempt_click(page::FILTER_BUTTON).await?;
        tokio::time::sleep(self.settle).await;
        self.session.attempt_click(page::NEW_FILTER).await?;
        self.session.wait_for_element(page::NEW_FILTER_APPLIED, self.filter_timeout).await?;
        tokio::time::sleep(self.settle).await;
        debug!("New filter applied");
        Ok(())
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Gives the session back without closing it.
    pub fn into_session(self) -> S {
        self.session
    }

    /// Closes the underlying session.
    pub async fn close(mut self) -> Result<(), SessionError> {
        self.session.close().await
    }
}

/// Runs a page operation, turning a panic inside it into an error.
async fn guard<T>(operation: impl Future<Output = Result<T>>) -> Result<T> {
    match AssertUnwindSafe(operation).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Err(anyhow!("unexpected failure: {}", panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amazon::models::{Condition, Status};
    use crate::format::{flatten, COLUMN_COUNT, ERROR_SENTINEL};
    use crate::session::mock::MockSession;

    const MAIN: &str = "https://www.amazon.co.jp/dp/B0TEST0001";
    const PANEL: &str = "https://www.amazon.co.jp/dp/B0TEST0001?aod=1";

    fn make_config() -> Config {
        Config { settle_ms: 0, container_timeout_ms: 100, filter_timeout_ms: 100, ..Config::default() }
    }

    fn main_page(price: &str, availability: &str, shipper: &str) -> String {
        format!(
            r#"<html><body><div id="dp-container">
                <div id="corePrice_feature_div"><span class="a-price"><span class="a-offscreen">{}</span></span></div>
                <div id="availability"><span>{}</span></div>
                <div id="merchantInfoFeature_feature_div"><span class="offer-display-feature-text-message">Main Shop</span></div>
                <div id="fulfillerInfoFeature_feature_div"><span class="offer-display-feature-text-message">{}</span></div>
            </div></body></html>"#,
            price, availability, shipper
        )
    }

    fn entry(condition: &str, price: &str, seller: &str, shipper: &str) -> String {
        format!(
            r#"<div id="aod-offer">
                <div id="aod-offer-heading"><span class="a-text-bold">{}</span></div>
                <div id="aod-offer-price"><span class="aok-offscreen">{}</span></div>
                <div id="aod-offer-shipsFrom"><span class="a-size-small a-color-base">{}</span></div>
                <div id="aod-offer-soldBy"><a href="/s">{}</a></div>
            </div>"#,
            condition, price, shipper, seller
        )
    }

    fn panel_page(entries: &[String], filtered: bool) -> String {
        let swatch = if filtered { r#"<span id="aod-swatch-id-new"></span>"# } else { "" };
        format!(
            r#"<html><body><div id="aod-container">{}<div id="aod-show-filter-button"></div>{}</div></body></html>"#,
            swatch,
            entries.concat()
        )
    }

    fn band_entries() -> Vec<String> {
        vec![
            entry("新品", "￥1,000", "Shop A", "Shop A"),
            entry("新品", "￥1,100", "Shop B", "Amazon"),
            entry("新品", "￥1,200", "Shop C", "Shop C"),
            entry("新品", "￥1,300", "Shop D", "Shop D"),
        ]
    }

    #[tokio::test]
    async fn test_resolve_band_median() {
        let session = MockSession::new()
            .with_page(MAIN, &main_page("", "通常2～3日以内に発送", "Shop Z"))
            .with_page(PANEL, &panel_page(&band_entries(), false));

        let mut resolver = Resolver::new(session, &make_config());
        let result = resolver.resolve(MAIN, PANEL, BandMultipliers::default()).await;

        assert_eq!(result.status, Status::Success);
        assert_eq!(result.total_offers, 4);
        assert_eq!(result.fba_count, 1);
        assert_eq!(result.fbm_count, 3);
        assert_eq!(result.inventory_score, 5);
        // Reference 1200, band 1020 - 1380
        assert_eq!(result.effective_sellers_count, 3);
        let optimal = result.optimal.unwrap();
        assert_eq!(optimal.total, 1200);
        assert_eq!(optimal.seller, "Shop C");
        assert_eq!(optimal.condition, Condition::New);
    }

    #[tokio::test]
    async fn test_resolve_trusts_stocked_fba_buy_box() {
        let session = MockSession::new()
            .with_page(MAIN, &main_page("￥1,000", "在庫あり。", "Amazon"))
            .with_page(PANEL, &panel_page(&band_entries(), false));

        let mut resolver = Resolver::new(session, &make_config());
        let result = resolver.resolve(MAIN, PANEL, BandMultipliers::default()).await;

        assert!(result.buy_box_fba);
        assert_eq!(result.buy_box.real_stock, 30);
        assert_eq!(result.total_offers, 5);
        assert_eq!(result.effective_sellers_count, 5);
        assert_eq!(result.optimal.as_ref().unwrap().total, 1000);
        assert_eq!(result.optimal.as_ref().unwrap().seller, "Main Shop");
        assert_eq!(result.offers.len(), 4);
        assert!(result.stock_sufficient());
    }

    #[tokio::test]
    async fn test_filter_swaps_in_new_only_panel() {
        let mut unfiltered = band_entries();
        unfiltered.push(entry("中古品 - 良い", "￥500", "Used Shop", "Used Shop"));
        unfiltered.push(entry("Collectible", "￥50", "Odd Shop", "Odd Shop"));

        let session = MockSession::new()
            .with_page(MAIN, &main_page("", "", "Shop Z"))
            .with_page(PANEL, &panel_page(&unfiltered, false))
            .with_filtered_page(PANEL, &panel_page(&band_entries(), true));

        let mut resolver = Resolver::new(session, &make_config());
        let result = resolver.resolve(MAIN, PANEL, BandMultipliers::default()).await;

        assert_eq!(result.total_offers, 4);
        assert!(result.offers.iter().all(|o| o.seller != "Odd Shop"));
        assert_eq!(
            resolver.session().clicks,
            vec![page::FILTER_BUTTON.to_string(), page::NEW_FILTER.to_string()]
        );
    }

    #[tokio::test]
    async fn test_filter_failure_is_tolerated() {
        let mut entries = band_entries();
        entries.push(entry("中古品 - 非常に良い", "￥700", "Used Shop", "Used Shop"));

        let session = MockSession::new()
            .with_page(MAIN, &main_page("", "", "Shop Z"))
            .with_page(PANEL, &panel_page(&entries, false))
            .failing_clicks();

        let mut resolver = Resolver::new(session, &make_config());
        let result = resolver.resolve(MAIN, PANEL, BandMultipliers::default()).await;

        // Used offers are still dropped by the extractor
        assert!(result.is_success());
        assert_eq!(result.total_offers, 4);
        assert_eq!(resolver.session().clicks.len(), 1);
    }

    #[tokio::test]
    async fn test_filter_marker_timeout_is_tolerated() {
        // Clicks succeed but the applied marker never shows up
        let session = MockSession::new()
            .with_page(MAIN, &main_page("", "", "Shop Z"))
            .with_page(PANEL, &panel_page(&band_entries(), false));

        let mut resolver = Resolver::new(session, &make_config());
        let result = resolver.resolve(MAIN, PANEL, BandMultipliers::default()).await;
        assert!(result.is_success());
        assert_eq!(result.total_offers, 4);
    }

    #[tokio::test]
    async fn test_primary_page_timeout_is_an_error_row() {
        let session = MockSession::new()
            .with_page(MAIN, "<html><body><p>still loading</p></body></html>")
            .with_page(PANEL, &panel_page(&band_entries(), false));

        let mut resolver = Resolver::new(session, &make_config());
        let result = resolver.resolve(MAIN, PANEL, BandMultipliers::default()).await;

        assert_eq!(result.status, Status::Error);
        assert!(result.error.as_deref().unwrap().contains("#dp-container"));
        assert_eq!(resolver.session().visited, vec![MAIN.to_string()]);

        let row = flatten(&result, crate::amazon::regions::Region::Jp);
        assert_eq!(row.len(), COLUMN_COUNT);
        assert!(row.iter().all(|cell| cell == ERROR_SENTINEL));
    }

    #[tokio::test]
    async fn test_navigation_failure_is_an_error() {
        let session = MockSession::new().with_page(MAIN, &main_page("￥1,000", "", "Amazon"));

        let mut resolver = Resolver::new(session, &make_config());
        let result = resolver.resolve(MAIN, PANEL, BandMultipliers::default()).await;

        assert_eq!(result.status, Status::Error);
        assert!(result.error.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_captcha_page_is_an_error() {
        let captcha = r#"<html><body><div id="dp-container"><form action="/errors/validateCaptcha"></form></div></body></html>"#;
        let session = MockSession::new()
            .with_page(MAIN, captcha)
            .with_page(PANEL, &panel_page(&band_entries(), false));

        let mut resolver = Resolver::new(session, &make_config());
        let result = resolver.resolve(MAIN, PANEL, BandMultipliers::default()).await;

        assert_eq!(result.status, Status::Error);
        assert!(result.error.unwrap().contains("CAPTCHA"));
    }

    #[tokio::test]
    async fn test_dog_product_image_is_not_blocked() {
        let product = main_page("￥1,000", "在庫あり。", "Amazon").replace(
            r#"<div id="dp-container">"#,
            r#"<div id="dp-container"><img id="landingImage" alt="Hotdog maker for dog lovers">"#,
        );
        let session = MockSession::new()
            .with_page(MAIN, &product)
            .with_page(PANEL, &panel_page(&band_entries(), false));

        let mut resolver = Resolver::new(session, &make_config());
        let result = resolver.resolve(MAIN, PANEL, BandMultipliers::default()).await;

        assert!(result.is_success(), "error: {:?}", result.error);
        assert_eq!(result.optimal.unwrap().total, 1000);
    }

    #[tokio::test]
    async fn test_service_unavailable_page_is_an_error() {
        let outage = r#"<html><body><div id="aod-container"><div class="a-box-inner"><a href="/ref=cs_503_link">Amazon.co.jp</a></div></div></body></html>"#;
        let session = MockSession::new()
            .with_page(MAIN, &main_page("￥1,000", "", "Amazon"))
            .with_page(PANEL, outage);

        let mut resolver = Resolver::new(session, &make_config());
        let result = resolver.resolve(MAIN, PANEL, BandMultipliers::default()).await;

        assert_eq!(result.status, Status::Error);
        assert!(result.error.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_panic_becomes_error_result() {
        let session = MockSession::new().panicking();

        let mut resolver = Resolver::new(session, &make_config());
        let result = resolver.resolve(MAIN, PANEL, BandMultipliers::default()).await;

        assert_eq!(result.status, Status::Error);
        assert!(result.error.unwrap().contains("renderer crashed"));
    }

    fn detail_page() -> String {
        main_page("￥1,980", "在庫あり。", "Amazon").replace(
            r#"<div id="dp-container">"#,
            r#"<div id="dp-container">
                <span id="productTitle"> Ceramic Mug (Blue) </span>
                <span class="a-price-whole">1,980</span>
                <div id="altImages"><ul>
                    <li class="item imageThumbnail"><img src="https://m.media-amazon.com/images/I/41mugA._AC_US40_.jpg"></li>
                </ul></div>"#,
        )
    }

    fn retry_config(max_retries: u32) -> Config {
        Config { max_retries, retry_delay_ms: 0, ..make_config() }
    }

    #[tokio::test]
    async fn test_product_details() {
        let session = MockSession::new().with_page(MAIN, &detail_page());
        let mut resolver = Resolver::new(session, &make_config());

        let details = resolver.product_details(MAIN, DetailMode::Electronics).await.unwrap();
        assert_eq!(details.asin.as_deref(), Some("B0TEST0001"));
        assert_eq!(details.title, "Ceramic Mug");
        assert_eq!(details.price, Some(1980));
    }

    #[tokio::test]
    async fn test_image_urls() {
        let session = MockSession::new().with_page(MAIN, &detail_page());
        let mut resolver = Resolver::new(session, &make_config());

        let urls = resolver.image_urls(MAIN).await.unwrap();
        assert_eq!(urls, vec!["https://m.media-amazon.com/images/I/41mugA._SL1500_.jpg"]);
    }

    #[tokio::test]
    async fn test_product_page_load_is_retried() {
        let session = MockSession::new().with_page(MAIN, &detail_page()).failing_navigations(2);
        let mut resolver = Resolver::new(session, &retry_config(3));

        let details = resolver.product_details(MAIN, DetailMode::Electronics).await.unwrap();
        assert_eq!(details.price, Some(1980));
        assert_eq!(resolver.session().visited.len(), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let session = MockSession::new().with_page(MAIN, &detail_page()).failing_navigations(5);
        let mut resolver = Resolver::new(session, &retry_config(2));

        let err = resolver.image_urls(MAIN).await.unwrap_err();
        assert!(format!("{:#}", err).contains("connection reset"));
        assert_eq!(resolver.session().visited.len(), 3);
    }

    #[tokio::test]
    async fn test_details_panic_becomes_error() {
        let mut resolver = Resolver::new(MockSession::new().panicking(), &retry_config(0));
        let err = resolver.product_details(MAIN, DetailMode::Book).await.unwrap_err();
        assert!(err.to_string().contains("renderer crashed"));
    }

    #[tokio::test]
    async fn test_resolver_survives_a_failed_product() {
        let other_main = "https://www.amazon.co.jp/dp/B0TEST0002";
        let session = MockSession::new()
            .with_page(MAIN, &main_page("", "", "Shop Z"))
            .with_page(PANEL, &panel_page(&band_entries(), false));

        let mut resolver = Resolver::new(session, &make_config());
        let failed = resolver.resolve(other_main, PANEL, BandMultipliers::default()).await;
        let ok = resolver.resolve(MAIN, PANEL, BandMultipliers::default()).await;

        assert!(!failed.is_success());
        assert!(ok.is_success());
    }

    #[tokio::test]
    async fn test_close_releases_session() {
        let resolver = Resolver::new(MockSession::new(), &make_config());
        let mut session = resolver.into_session();
        session.close().await.unwrap();

        assert!(session.closed);
        assert!(matches!(session.current_html().await, Err(SessionError::Closed)));

        let resolver = Resolver::new(MockSession::new(), &make_config());
        assert!(resolver.close().await.is_ok());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let resolve_once = || {
            let session = MockSession::new()
                .with_page(MAIN, &main_page("￥1,150", "残り2点", "Shop Z"))
                .with_page(PANEL, &panel_page(&band_entries(), false));
            let mut resolver = Resolver::new(session, &make_config());
            tokio_test::block_on(resolver.resolve(MAIN, PANEL, BandMultipliers::default()))
        };

        let first = resolve_once();
        assert!(first.is_success());
        assert_eq!(first, resolve_once());
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
