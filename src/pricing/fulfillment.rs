//! FBA/FBM classification and inventory signals.

use crate::amazon::markers::Markers;
use crate::amazon::models::Offer;
use serde::{Deserialize, Serialize};

/// Buy-box stock above this count counts as well stocked.
pub const MIN_TRUSTED_STOCK: u32 = 2;

/// Inventory score at which stock counts as sufficient on its own.
pub const SUFFICIENT_INVENTORY_SCORE: usize = 4;

/// Logistics path of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fulfillment {
    /// Fulfilled by the platform (FBA)
    Platform,
    /// Fulfilled by the merchant (FBM)
    Merchant,
}

/// Classifies an offer by its shipper text.
pub fn classify(offer: &Offer, markers: &Markers) -> Fulfillment {
    if markers.is_platform_fulfilled(&offer.shipper) {
        Fulfillment::Platform
    } else {
        Fulfillment::Merchant
    }
}

/// Aggregate stock depth across a unique offer set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySignals {
    pub fba_count: usize,
    pub fbm_count: usize,
    /// `2 * fba_count + fbm_count`; FBA stock replenishes faster
    pub inventory_score: usize,
}

impl InventorySignals {
    pub fn from_offers(offers: &[Offer], markers: &Markers) -> Self {
        let fba_count =
            offers.iter().filter(|o| classify(o, markers) == Fulfillment::Platform).count();
        let fbm_count = offers.len() - fba_count;

        Self { fba_count, fbm_count, inventory_score: 2 * fba_count + fbm_count }
    }
}

/// Either a well-stocked FBA buy-box or a deep enough offer set is enough.
pub fn is_stock_sufficient(real_stock: u32, buy_box_fba: bool, inventory_score: usize) -> bool {
    (real_stock > MIN_TRUSTED_STOCK && buy_box_fba) || inventory_score >= SUFFICIENT_INVENTORY_SCORE
}
