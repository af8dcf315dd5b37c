//! CSS selectors for Amazon product and offer pages.
//!
//! This file contains all CSS selectors used for reading the product page
//! (buy-box, detail fields, gallery) and the all-offers panel. Update this
//! file when Amazon changes their HTML structure.
//!
//! **Update process**: When parsing fails, capture HTML sample,
//! update selectors, and add test fixture.

use scraper::Selector;
use std::sync::LazyLock;

/// Selectors for the buy-box on the product detail page.
pub mod buy_box {
    use super::*;

    /// Visible buy-box price.
    pub static PRICE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("#corePrice_feature_div .a-price .a-offscreen").unwrap());

    /// Availability block ("In Stock", "Only 3 left in stock").
    pub static AVAILABILITY: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("#availability").unwrap());

    /// "Sold by" info block.
    pub static SELLER: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("#merchantInfoFeature_feature_div .offer-display-feature-text-message")
            .unwrap()
    });

    /// "Ships from" info block.
    pub static SHIPPER: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("#fulfillerInfoFeature_feature_div .offer-display-feature-text-message")
            .unwrap()
    });
}

/// Selectors for entries in the all-offers (AOD) panel.
pub mod panel {
    use super::*;

    /// One offer entry.
    pub static OFFER: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#aod-offer").unwrap());

    /// Condition heading ("New", "Used - Good").
    pub static CONDITION: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("#aod-offer-heading .a-text-bold").unwrap());

    /// Price candidates, most explicit first.
    pub static PRICES: LazyLock<[Selector; 2]> = LazyLock::new(|| {
        [
            Selector::parse("#aod-offer-price span.aok-offscreen").unwrap(),
            Selector::parse(".a-price .a-offscreen").unwrap(),
        ]
    });

    /// Attribute carrying the structured delivery price.
    pub const DELIVERY_PRICE_ATTR: &str = "data-csa-c-delivery-price";

    /// Element carrying the structured delivery price.
    pub static DELIVERY_PRICE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("[data-csa-c-delivery-price]").unwrap());

    /// Visible shipping text fallback.
    pub static SHIPPING_TEXT: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("#aod-offer-shipping-charge-string").unwrap());

    /// Seller name: linked storefront, or plain text for the platform itself.
    pub static SELLER: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "#aod-offer-soldBy a, \
             #aod-offer-soldBy .a-size-small.a-color-base",
        )
        .unwrap()
    });

    /// Shipper name.
    pub static SHIPPER: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("#aod-offer-shipsFrom .a-size-small.a-color-base").unwrap());
}

/// Selectors for product detail fields on the product page.
pub mod details {
    use super::*;

    pub static TITLE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("#productTitle").unwrap());

    /// Whole-unit part of the displayed price.
    pub static PRICE_WHOLE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse(".a-price-whole").unwrap());

    /// Feature bullet list.
    pub static FEATURE_LIST: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("ul.a-unordered-list.a-vertical.a-spacing-mini").unwrap());

    pub static LIST_ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());

    /// Byline block: brand link, or author links on book pages.
    pub static BYLINE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("#bylineInfo_feature_div").unwrap());

    pub static BYLINE_AUTHORS: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("#bylineInfo_feature_div .author .a-link-normal").unwrap()
    });

    /// Author name in the "About the author" section.
    pub static ABOUT_AUTHOR: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("div.about-author-container a.a-link-normal").unwrap()
    });

    /// Items of the bulleted detail list.
    pub static BULLET_ITEMS: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("#detailBullets_feature_div li").unwrap());

    /// Bold key of a detail bullet.
    pub static BULLET_KEY: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("span.a-text-bold").unwrap());

    pub static BULLET_RATING: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("span.a-icon-alt").unwrap());

    pub static BULLET_REVIEW_COUNT: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("#acrCustomerReviewText").unwrap());

    /// Detail tables, in reading order: book/general details first, then
    /// technical specifications.
    pub static TABLES: LazyLock<[Selector; 2]> = LazyLock::new(|| {
        [
            Selector::parse("table#productDetails_detailBullets_sections1").unwrap(),
            Selector::parse("table#productDetails_techSpec_section_1").unwrap(),
        ]
    });

    pub static TABLE_ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());

    /// Labelled key and value cells of a detail table row.
    pub static TABLE_KEY: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("th.prodDetSectionEntry, td.prodDetSectionEntry").unwrap()
    });

    pub static TABLE_VALUE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("td.prodDetInfoEntry").unwrap());

    /// Unlabelled fallbacks for rows without the entry classes.
    pub static TABLE_HEADER_CELL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("th").unwrap());

    pub static TABLE_DATA_CELL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("td").unwrap());
}

/// Selectors for product gallery images.
pub mod images {
    use super::*;

    /// Gallery thumbnails, used when the page script carries no image data.
    pub static THUMBNAILS: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "#altImages li.item.imageThumbnail img, \
             #altImages li.item img",
        )
        .unwrap()
    });
}

/// Selectors handed to the page session for waits and clicks.
pub mod page {
    /// Container that marks a loaded product page.
    pub const PRODUCT_CONTAINER: &str = "#dp-container";

    /// Container that marks a loaded offers panel.
    pub const PANEL_CONTAINER: &str = "#aod-container";

    /// Button that opens the panel filter drawer.
    pub const FILTER_BUTTON: &str = "#aod-show-filter-button";

    /// "New" condition filter toggle.
    pub const NEW_FILTER: &str = "#new";

    /// Swatch shown once the "New" filter is active.
    pub const NEW_FILTER_APPLIED: &str = "#aod-swatch-id-new";
}

/// Selectors for detecting block pages.
pub mod errors {
    use super::*;

    /// CAPTCHA form.
    pub static CAPTCHA: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "form[action*='validateCaptcha'], \
             img[src*='captcha']",
        )
        .unwrap()
    });

    /// Link that only Amazon's 503 error page carries.
    pub static SERVICE_UNAVAILABLE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a[href*='/ref=cs_503_link']").unwrap());

    /// Dog picture of the 503 page. Product images use the title as alt
    /// text, so this only counts on pages without a rendered container.
    pub static DOG_IMAGE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("img[alt*='dog']").unwrap());

    /// Containers of a rendered product page or offers panel.
    pub static RENDERED_CONTAINER: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("#dp-container, #aod-container").unwrap());
}
