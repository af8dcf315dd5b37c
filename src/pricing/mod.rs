//! Offer aggregation: deduplication, fulfillment signals and price selection.

pub mod band;
pub mod dedup;
pub mod fulfillment;

pub use band::{select_price, BandMultipliers, Selection, SelectionRule};
pub use dedup::{merge_offers, unique_offers};
pub use fulfillment::{classify, Fulfillment, InventorySignals};

use crate::amazon::markers::Markers;
use crate::amazon::models::{BuyBoxSnapshot, Offer, ProductResult, Status};
use tracing::debug;

/// Assembles a successful result from extracted page data.
///
/// Pure: the same buy-box and panel offers always yield the same result.
pub fn aggregate(
    buy_box: BuyBoxSnapshot,
    panel_offers: Vec<Offer>,
    markers: &Markers,
    multipliers: BandMultipliers,
) -> ProductResult {
    let unique = merge_offers(&buy_box, panel_offers);
    let signals = InventorySignals::from_offers(&unique, markers);
    let buy_box_fba = classify(&buy_box.offer, markers) == Fulfillment::Platform;

    let selection = select_price(&unique, &buy_box, buy_box_fba, multipliers);
    debug!(
        "Aggregated {} unique offers ({} FBA, {} FBM), rule {:?}",
        unique.len(),
        signals.fba_count,
        signals.fbm_count,
        selection.rule
    );

    ProductResult {
        status: Status::Success,
        buy_box,
        offers: selection.display,
        total_offers: unique.len(),
        fba_count: signals.fba_count,
        fbm_count: signals.fbm_count,
        inventory_score: signals.inventory_score,
        effective_sellers_count: selection.effective_sellers_count,
        optimal: selection.optimal,
        buy_box_fba,
        error: None,
    }
}
