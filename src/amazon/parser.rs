//! HTML extraction for the buy-box page and the all-offers panel.
//!
//! Nothing in here fails: every lookup yields an `Option`, and one assembly
//! step per record fills the documented sentinels.

use crate::amazon::markers::Markers;
use crate::amazon::models::{BuyBoxSnapshot, Condition, Offer, Origin, UNKNOWN};
use crate::amazon::regions::Region;
use crate::amazon::selectors::{buy_box, errors, panel};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};

/// Parser for Amazon offer pages.
pub struct Parser {
    region: Region,
}

/// Raw buy-box fields as found on the page.
#[derive(Debug, Default)]
struct BuyBoxFields {
    price: Option<u64>,
    availability: Option<String>,
    seller: Option<String>,
    shipper: Option<String>,
}

/// Raw panel entry fields as found on the page.
#[derive(Debug, Default)]
struct PanelFields {
    condition: Option<String>,
    price: Option<u64>,
    shipping: Option<String>,
    seller: Option<String>,
    shipper: Option<String>,
}

impl Parser {
    /// Creates a new parser for the given region.
    pub fn new(region: Region) -> Self {
        Self { region }
    }

    fn markers(&self) -> &'static Markers {
        self.region.markers()
    }

    /// Reads the buy-box offer and its stock count from a product page.
    pub fn parse_buy_box(&self, html: &str) -> BuyBoxSnapshot {
        let document = Html::parse_document(html);

        let fields = BuyBoxFields {
            price: first_text(&document.root_element(), &buy_box::PRICE)
                .and_then(|text| self.clean_price(&text)),
            availability: first_text(&document.root_element(), &buy_box::AVAILABILITY),
            seller: first_text(&document.root_element(), &buy_box::SELLER),
            shipper: first_text(&document.root_element(), &buy_box::SHIPPER),
        };
        trace!("Buy-box fields: {:?}", fields);

        self.assemble_buy_box(fields)
    }

    fn assemble_buy_box(&self, fields: BuyBoxFields) -> BuyBoxSnapshot {
        let real_stock = fields
            .availability
            .as_deref()
            .and_then(|text| self.markers().read_stock(text))
            .unwrap_or(0);

        let mut offer = Offer::new(fields.price, Origin::PrimaryOffer);
        offer.seller = fields.seller.unwrap_or_else(|| UNKNOWN.to_string());
        offer.shipper = fields.shipper.unwrap_or_else(|| UNKNOWN.to_string());
        offer.condition = if offer.price.is_some() { Condition::New } else { Condition::Unknown };

        BuyBoxSnapshot { offer, real_stock }
    }

    /// Reads every non-Used offer with a parsable price from the offers panel.
    pub fn parse_panel_offers(&self, html: &str) -> Vec<Offer> {
        let document = Html::parse_document(html);
        let mut offers = Vec::new();

        for element in document.select(&panel::OFFER) {
            let fields = self.panel_fields(element);
            match self.assemble_panel_offer(fields) {
                Some(offer) => {
                    trace!("Parsed panel offer: {:?}", offer);
                    offers.push(offer);
                }
                None => trace!("Skipping panel entry"),
            }
        }

        debug!("Parsed {} panel offers", offers.len());
        offers
    }

    fn panel_fields(&self, element: ElementRef) -> PanelFields {
        // Explicit numeric span first, generic price block second.
        let price = panel::PRICES.iter().find_map(|selector| {
            first_text(&element, selector).and_then(|text| self.clean_price(&text))
        });

        let shipping = element
            .select(&panel::DELIVERY_PRICE)
            .next()
            .and_then(|e| e.value().attr(panel::DELIVERY_PRICE_ATTR))
            .map(String::from)
            .or_else(|| first_text(&element, &panel::SHIPPING_TEXT));

        PanelFields {
            condition: first_text(&element, &panel::CONDITION),
            price,
            shipping,
            seller: first_text(&element, &panel::SELLER),
            shipper: first_text(&element, &panel::SHIPPER),
        }
    }

    fn assemble_panel_offer(&self, fields: PanelFields) -> Option<Offer> {
        let condition_text = fields.condition?;
        if self.markers().is_used(&condition_text) {
            return None;
        }

        let mut offer = Offer::new(Some(fields.price?), Origin::PanelOffer);
        offer.shipping_fee = self.clean_shipping_fee(fields.shipping.as_deref());
        offer.seller = fields.seller.unwrap_or_else(|| UNKNOWN.to_string());
        offer.shipper = fields.shipper.unwrap_or_else(|| UNKNOWN.to_string());
        offer.condition =
            if self.markers().is_new(&condition_text) { Condition::New } else { Condition::Unknown };

        Some(offer)
    }

    /// Returns a description of the block page this HTML shows, if any.
    pub fn detect_block(&self, html: &str) -> Option<&'static str> {
        let document = Html::parse_document(html);

        if document.select(&errors::CAPTCHA).next().is_some() {
            return Some("CAPTCHA page");
        }
        if document.select(&errors::SERVICE_UNAVAILABLE).next().is_some() {
            return Some("Amazon error page (503)");
        }
        let rendered = document.select(&errors::RENDERED_CONTAINER).next().is_some();
        if !rendered && document.select(&errors::DOG_IMAGE).next().is_some() {
            return Some("Amazon error page (503)");
        }
        None
    }

    /// Converts price text to minor currency units.
    ///
    /// Uses the last run of digit groups in the text, so currency prefixes and
    /// thousands separators are ignored. Returns `None` when there are no
    /// digits.
    pub fn clean_price(&self, text: &str) -> Option<u64> {
        let run = last_numeric_run(text)?;

        if self.region.minor_digits() == 0 {
            return digits_only(run).parse().ok();
        }

        let (whole, fraction) = match run.rsplit_once('.') {
            Some((whole, tail))
                if (1..=2).contains(&tail.len()) && tail.chars().all(|c| c.is_ascii_digit()) =>
            {
                (whole, tail)
            }
            _ => (run, ""),
        };

        let whole_digits = digits_only(whole);
        let whole: u64 = if whole_digits.is_empty() { 0 } else { whole_digits.parse().ok()? };
        let fraction: u64 = if fraction.is_empty() {
            0
        } else {
            format!("{:0<2}", fraction).parse().ok()?
        };

        whole.checked_mul(100)?.checked_add(fraction)
    }

    /// Converts shipping text to minor currency units; missing or free is 0.
    pub fn clean_shipping_fee(&self, text: Option<&str>) -> u64 {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return 0;
        };
        if self.markers().is_free(text) {
            return 0;
        }

        if self.region.minor_digits() == 0 {
            digits_only(text).parse().unwrap_or(0)
        } else {
            self.clean_price(text).unwrap_or(0)
        }
    }
}

/// Text of the first match, whitespace collapsed; `None` if absent or blank.
pub(crate) fn first_text(scope: &ElementRef, selector: &Selector) -> Option<String> {
    let element = scope.select(selector).next()?;
    let text = element.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn last_numeric_run(text: &str) -> Option<&str> {
    text.split(|c: char| !(c.is_ascii_digit() || c == ',' || c == '.'))
        .filter(|run| run.chars().any(|c| c.is_ascii_digit()))
        .last()
        .map(|run| run.trim_matches(|c: char| !c.is_ascii_digit()))
}

pub(crate) fn digits_only(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}
