//! Flattening a product result into one fixed-width output row.

use crate::amazon::models::{Condition, Offer, ProductResult};
use crate::amazon::regions::Region;

/// Displayed offers per row.
pub const MAX_DISPLAY_OFFERS: usize = 10;

/// Fixed leading columns before the offer tuples.
pub const FIXED_COLUMNS: usize = 15;

/// Cells per displayed offer.
pub const OFFER_COLUMNS: usize = 5;

/// Total row width, success and error rows alike.
pub const COLUMN_COUNT: usize = FIXED_COLUMNS + MAX_DISPLAY_OFFERS * OFFER_COLUMNS;

/// Cell value for every column of an error row.
pub const ERROR_SENTINEL: &str = "ERROR";

/// Cell value for unresolved fields.
pub const NOT_AVAILABLE: &str = "N/A";

pub const STOCK_SUFFICIENT: &str = "sufficient";
pub const STOCK_INSUFFICIENT: &str = "insufficient";

const FIXED_NAMES: [&str; FIXED_COLUMNS] = [
    "optimal_price",
    "optimal_price_condition",
    "optimal_price_shipper",
    "optimal_price_seller",
    "stock_status",
    "inventory_score",
    "real_stock",
    "effective_sellers",
    "total_offers",
    "fba_count",
    "fbm_count",
    "buy_box_price",
    "buy_box_condition",
    "buy_box_shipper",
    "buy_box_seller",
];

const OFFER_FIELDS: [&str; OFFER_COLUMNS] = ["price", "shipping", "condition", "shipper", "seller"];

/// Column names in output order.
pub fn column_names() -> Vec<String> {
    let mut names: Vec<String> = FIXED_NAMES.iter().map(|n| n.to_string()).collect();
    for i in 1..=MAX_DISPLAY_OFFERS {
        names.extend(OFFER_FIELDS.iter().map(|field| format!("offer{}_{}", i, field)));
    }
    names
}

/// Renders a minor-unit amount in the region's currency notation, without symbol.
pub fn format_money(amount: u64, region: Region) -> String {
    match region.minor_digits() {
        0 => amount.to_string(),
        _ => format!("{}.{:02}", amount / 100, amount % 100),
    }
}

/// Flattens a result into exactly [`COLUMN_COUNT`] cells.
///
/// Error results become a row of [`ERROR_SENTINEL`] cells; missing offers
/// are padded with empty cells.
pub fn flatten(result: &ProductResult, region: Region) -> Vec<String> {
    if !result.is_success() {
        return vec![ERROR_SENTINEL.to_string(); COLUMN_COUNT];
    }

    let mut row = Vec::with_capacity(COLUMN_COUNT);

    match &result.optimal {
        Some(optimal) => row.extend([
            format_money(optimal.total, region),
            optimal.condition.to_string(),
            optimal.shipper.clone(),
            optimal.seller.clone(),
        ]),
        None => row.extend(std::iter::repeat(NOT_AVAILABLE.to_string()).take(4)),
    }

    let stock_status =
        if result.stock_sufficient() { STOCK_SUFFICIENT } else { STOCK_INSUFFICIENT };
    row.extend([
        stock_status.to_string(),
        result.inventory_score.to_string(),
        result.buy_box.real_stock.to_string(),
        result.effective_sellers_count.to_string(),
        result.total_offers.to_string(),
        result.fba_count.to_string(),
        result.fbm_count.to_string(),
    ]);

    let buy_box = &result.buy_box.offer;
    row.extend([
        buy_box.price.map_or_else(|| NOT_AVAILABLE.to_string(), |p| format_money(p, region)),
        condition_cell(buy_box),
        buy_box.shipper.clone(),
        buy_box.seller.clone(),
    ]);

    for offer in result.offers.iter().take(MAX_DISPLAY_OFFERS) {
        row.extend([
            offer.price.map(|p| format_money(p, region)).unwrap_or_default(),
            format_money(offer.shipping_fee, region),
            condition_cell(offer),
            offer.shipper.clone(),
            offer.seller.clone(),
        ]);
    }

    row.resize(COLUMN_COUNT, String::new());
    row
}

fn condition_cell(offer: &Offer) -> String {
    match offer.condition {
        Condition::Unknown if offer.price.is_none() => NOT_AVAILABLE.to_string(),
        condition => condition.to_string(),
    }
}
