//! Optimal price selection.
//!
//! A well-stocked, platform-fulfilled buy-box is trusted as is. Otherwise the
//! third cheapest offer anchors a tolerance band, and the median of the offers
//! inside the band becomes the optimal price once at least three sellers
//! compete there. For an even count the lower middle offer is taken.

use crate::amazon::models::{BuyBoxSnapshot, Offer, OptimalPrice};
use crate::pricing::fulfillment::MIN_TRUSTED_STOCK;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Index of the band reference offer in the ascending total-price order.
pub const REFERENCE_INDEX: usize = 2;

/// Fewest offers needed inside the band to trust its median.
pub const MIN_BAND_SIZE: usize = 3;

/// Tolerance multipliers applied to the reference price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandMultipliers {
    pub lower: f64,
    pub upper: f64,
}

impl Default for BandMultipliers {
    fn default() -> Self {
        Self { lower: 0.85, upper: 1.15 }
    }
}

impl BandMultipliers {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Inclusive band bounds around a reference total.
    pub fn bounds(&self, reference: u64) -> (f64, f64) {
        (reference as f64 * self.lower, reference as f64 * self.upper)
    }
}

/// Which branch produced the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionRule {
    /// Buy-box trusted on its own
    BuyBoxTrust,
    /// Median of the band
    BandMedian,
    /// Band held fewer than three offers; unresolved
    ThinBand,
    /// Fewer than three offers overall; unresolved
    Sparse,
}

/// Outcome of price selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub rule: SelectionRule,
    pub optimal: Option<OptimalPrice>,
    /// Offers the optimal price was chosen among
    pub eligible: Vec<Offer>,
    pub effective_sellers_count: usize,
    /// Eligible offers minus the buy-box, cheapest first
    pub display: Vec<Offer>,
}

/// Picks the optimal price from a unique offer set.
pub fn select_price(
    unique: &[Offer],
    buy_box: &BuyBoxSnapshot,
    buy_box_fba: bool,
    multipliers: BandMultipliers,
) -> Selection {
    let (rule, optimal, eligible) = if trusts_buy_box(buy_box, buy_box_fba) {
        debug!("Buy-box is FBA with stock {}, trusting its price", buy_box.real_stock);
        (SelectionRule::BuyBoxTrust, OptimalPrice::from_offer(&buy_box.offer), unique.to_vec())
    } else {
        select_from_band(unique, multipliers)
    };

    let effective_sellers_count = eligible.len();
    let display = display_offers(&eligible, buy_box);

    Selection { rule, optimal, eligible, effective_sellers_count, display }
}

fn trusts_buy_box(buy_box: &BuyBoxSnapshot, buy_box_fba: bool) -> bool {
    buy_box.real_stock > MIN_TRUSTED_STOCK && buy_box.has_price() && buy_box_fba
}

fn select_from_band(
    unique: &[Offer],
    multipliers: BandMultipliers,
) -> (SelectionRule, Option<OptimalPrice>, Vec<Offer>) {
    let sorted = sorted_by_total(unique.to_vec());

    let Some(reference) = sorted.get(REFERENCE_INDEX).and_then(Offer::total_price) else {
        debug!("Only {} offers, skipping the price band", sorted.len());
        return (SelectionRule::Sparse, None, sorted);
    };

    let (low, high) = multipliers.bounds(reference);
    debug!("Band reference {}, range {:.0} - {:.0}", reference, low, high);

    let band: Vec<Offer> = sorted
        .into_iter()
        .filter(|offer| {
            offer.total_price().is_some_and(|total| {
                let total = total as f64;
                low <= total && total <= high
            })
        })
        .collect();
    debug!("{} offers inside the band", band.len());

    if band.len() < MIN_BAND_SIZE {
        return (SelectionRule::ThinBand, None, band);
    }

    let band = sorted_by_total(band);
    let optimal = OptimalPrice::from_offer(&band[median_index(band.len())]);
    (SelectionRule::BandMedian, optimal, band)
}

/// Middle index for odd counts, lower middle for even counts.
pub fn median_index(len: usize) -> usize {
    if len % 2 == 1 {
        len / 2
    } else {
        (len / 2).saturating_sub(1)
    }
}

fn display_offers(eligible: &[Offer], buy_box: &BuyBoxSnapshot) -> Vec<Offer> {
    let buy_box_key = buy_box.offer.key();
    let display =
        eligible.iter().filter(|offer| offer.key() != buy_box_key).cloned().collect::<Vec<_>>();
    sorted_by_total(display)
}

/// Stable ascending sort by total price.
fn sorted_by_total(mut offers: Vec<Offer>) -> Vec<Offer> {
    offers.sort_by_key(Offer::sort_total);
    offers
}
