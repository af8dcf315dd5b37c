//! Data models for offers, buy-box snapshots and per-product results.

use crate::pricing::fulfillment::is_stock_sufficient;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seller/shipper text used when the page shows none.
pub const UNKNOWN: &str = "unknown";

/// Offer condition. Used offers are dropped during extraction and never
/// reach aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Condition {
    New,
    Used,
    #[default]
    Unknown,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::New => write!(f, "New"),
            Condition::Used => write!(f, "Used"),
            Condition::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Which page view an offer was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// The highlighted buy-box offer on the product page.
    PrimaryOffer,
    /// An entry of the all-offers panel.
    PanelOffer,
}

/// A single marketplace offer. Prices are integer minor-currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    /// Item price; `None` when the page showed no parsable price
    pub price: Option<u64>,
    pub shipping_fee: u64,
    pub seller: String,
    pub shipper: String,
    pub condition: Condition,
    pub origin: Origin,
}

/// Deduplication identity: (price, seller, shipper).
///
/// Deliberately coarser than the offer itself: two listings with the same
/// price, seller and shipper collapse into one even if their shipping fee or
/// condition text differ.
pub type OfferKey = (Option<u64>, String, String);

impl Offer {
    /// Creates an offer with the field defaults (no shipping fee, unknown
    /// seller and shipper, unknown condition).
    pub fn new(price: Option<u64>, origin: Origin) -> Self {
        Self {
            price,
            shipping_fee: 0,
            seller: UNKNOWN.to_string(),
            shipper: UNKNOWN.to_string(),
            condition: Condition::Unknown,
            origin,
        }
    }

    /// Price plus shipping, if the price is known and the sum fits.
    pub fn total_price(&self) -> Option<u64> {
        self.price?.checked_add(self.shipping_fee)
    }

    /// Total used for ordering; unknown prices sort last.
    pub fn sort_total(&self) -> u64 {
        self.total_price().unwrap_or(u64::MAX)
    }

    pub fn key(&self) -> OfferKey {
        (self.price, self.seller.clone(), self.shipper.clone())
    }
}

/// The buy-box offer together with the stock count read next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyBoxSnapshot {
    pub offer: Offer,
    /// Parsed availability; 0 when unparsable
    pub real_stock: u32,
}

impl BuyBoxSnapshot {
    /// True when the buy-box showed a parsable price.
    pub fn has_price(&self) -> bool {
        self.offer.price.is_some()
    }
}

/// The representative offer picked by price selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimalPrice {
    /// Total price (price + shipping) of the chosen offer
    pub total: u64,
    pub condition: Condition,
    pub shipper: String,
    pub seller: String,
}

impl OptimalPrice {
    pub fn from_offer(offer: &Offer) -> Option<Self> {
        Some(Self {
            total: offer.total_price()?,
            condition: offer.condition,
            shipper: offer.shipper.clone(),
            seller: offer.seller.clone(),
        })
    }
}

/// Outcome of one resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Finished result for one product. Built once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductResult {
    pub status: Status,
    pub buy_box: BuyBoxSnapshot,
    /// Display offers: eligible offers minus the buy-box, cheapest first
    pub offers: Vec<Offer>,
    pub total_offers: usize,
    pub fba_count: usize,
    pub fbm_count: usize,
    pub inventory_score: usize,
    pub effective_sellers_count: usize,
    /// `None` means unresolved ("N/A")
    pub optimal: Option<OptimalPrice>,
    /// Whether the buy-box shipper is platform fulfilled
    pub buy_box_fba: bool,
    /// Failure reason for error results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProductResult {
    /// Builds an error result. The counters hold placeholders that no output
    /// exposes: the row writer renders every cell as the error sentinel and
    /// JSON output carries only the reason.
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            buy_box: BuyBoxSnapshot { offer: Offer::new(None, Origin::PrimaryOffer), real_stock: 0 },
            offers: Vec::new(),
            total_offers: 0,
            fba_count: 0,
            fbm_count: 0,
            inventory_score: 0,
            effective_sellers_count: 0,
            optimal: None,
            buy_box_fba: false,
            error: Some(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Stock is sufficient when a well-stocked FBA buy-box exists or the
    /// inventory score reaches 4. Error results are never sufficient.
    pub fn stock_sufficient(&self) -> bool {
        self.is_success()
            && is_stock_sufficient(self.buy_box.real_stock, self.buy_box_fba, self.inventory_score)
    }
}
