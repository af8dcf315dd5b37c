//! Merging buy-box and panel offers into one unique sequence.

use crate::amazon::models::{BuyBoxSnapshot, Offer, OfferKey};
use std::collections::HashSet;
use tracing::trace;

/// Merges the buy-box offer (only when it has a price) ahead of the panel
/// offers and drops repeats of the same (price, seller, shipper) key.
pub fn merge_offers(buy_box: &BuyBoxSnapshot, panel: Vec<Offer>) -> Vec<Offer> {
    let buy_box_offer = buy_box.has_price().then(|| buy_box.offer.clone());
    unique_offers(buy_box_offer.into_iter().chain(panel))
}

/// Keeps the first offer seen for each key, preserving order.
pub fn unique_offers(offers: impl IntoIterator<Item = Offer>) -> Vec<Offer> {
    let mut seen: HashSet<OfferKey> = HashSet::new();
    let mut unique = Vec::new();

    for offer in offers {
        if seen.insert(offer.key()) {
            unique.push(offer);
        } else {
            trace!("Dropping duplicate offer: {:?}", offer.key());
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amazon::models::{Condition, Origin};

    fn make_offer(price: u64, seller: &str, shipper: &str, origin: Origin) -> Offer {
        Offer {
            price: Some(price),
            shipping_fee: 0,
            seller: seller.to_string(),
            shipper: shipper.to_string(),
            condition: Condition::New,
            origin,
        }
    }

    fn panel(price: u64, seller: &str) -> Offer {
        make_offer(price, seller, "Amazon", Origin::PanelOffer)
    }

    fn buy_box(price: Option<u64>) -> BuyBoxSnapshot {
        let mut offer = make_offer(0, "Shop A", "Amazon", Origin::PrimaryOffer);
        offer.price = price;
        BuyBoxSnapshot { offer, real_stock: 5 }
    }

    #[test]
    fn test_buy_box_leads_and_panel_copy_collapses() {
        let merged = merge_offers(
            &buy_box(Some(1000)),
            vec![panel(1000, "Shop A"), panel(1100, "Shop B")],
        );

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].origin, Origin::PrimaryOffer);
        assert_eq!(merged[1].seller, "Shop B");
    }

    #[test]
    fn test_unpriced_buy_box_is_left_out() {
        let merged = merge_offers(&buy_box(None), vec![panel(1000, "Shop A")]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].origin, Origin::PanelOffer);
    }

    #[test]
    fn test_key_collapses_distinct_listings() {
        let mut with_fee = panel(1000, "Shop B");
        with_fee.shipping_fee = 500;

        let merged = merge_offers(&buy_box(None), vec![panel(1000, "Shop B"), with_fee]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].shipping_fee, 0);
    }

    #[test]
    fn test_first_seen_order_is_kept() {
        let merged = merge_offers(
            &buy_box(None),
            vec![panel(1300, "C"), panel(1100, "A"), panel(1300, "C"), panel(1200, "B")],
        );
        let sellers: Vec<_> = merged.iter().map(|o| o.seller.as_str()).collect();
        assert_eq!(sellers, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let offers = vec![
            panel(1000, "A"),
            panel(1000, "A"),
            panel(1000, "B"),
            make_offer(1000, "A", "Merchant", Origin::PanelOffer),
            panel(900, "A"),
        ];

        let once = unique_offers(offers);
        let twice = unique_offers(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 4);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(merge_offers(&buy_box(None), Vec::new()).is_empty());
        assert_eq!(merge_offers(&buy_box(Some(1)), Vec::new()).len(), 1);
    }
}
