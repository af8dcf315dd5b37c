//! Output formatting for resolved products (table, JSON, markdown, CSV).

pub mod details;
pub mod images;
pub mod row;

pub use details::DetailsEntry;
pub use images::ImagesEntry;

pub use row::{column_names, flatten, format_money, COLUMN_COUNT, ERROR_SENTINEL, NOT_AVAILABLE};

use crate::amazon::models::{ProductResult, Status};
use crate::amazon::regions::Region;
use crate::config::OutputFormat;
use serde::Serialize;

/// One resolved product and the input it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// ASIN or main page URL
    pub label: String,
    pub result: ProductResult,
}

impl Resolution {
    pub fn new(label: impl Into<String>, result: ProductResult) -> Self {
        Self { label: label.into(), result }
    }
}

/// Error entries carry the reason instead of a result, so zeroed counters
/// never pass for an empty product.
#[derive(Serialize)]
struct JsonEntry<'a> {
    label: &'a str,
    status: Status,
    row: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a ProductResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

/// Formats resolutions for output.
pub struct Formatter {
    format: OutputFormat,
    region: Region,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat, region: Region) -> Self {
        Self { format, region }
    }

    /// Formats a single resolution.
    pub fn format_one(&self, resolution: &Resolution) -> String {
        match self.format {
            OutputFormat::Table => self.table_single(resolution),
            _ => self.format_all(std::slice::from_ref(resolution)),
        }
    }

    /// Formats any number of resolutions.
    pub fn format_all(&self, resolutions: &[Resolution]) -> String {
        if resolutions.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => self.csv_header(),
                _ => "No products resolved.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => self.json(resolutions),
            OutputFormat::Table => self.table_summary(resolutions),
            OutputFormat::Markdown => self.markdown(resolutions),
            OutputFormat::Csv => self.csv(resolutions),
        }
    }

    /// Column header in the configured format.
    pub fn format_columns(&self) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&column_names()).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Csv => self.csv_header(),
            _ => column_names()
                .iter()
                .enumerate()
                .map(|(i, name)| format!("{:>2}  {}", i + 1, name))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    // JSON formatting

    fn json(&self, resolutions: &[Resolution]) -> String {
        let entries: Vec<JsonEntry<'_>> = resolutions
            .iter()
            .map(|r| JsonEntry {
                label: &r.label,
                status: r.result.status,
                row: flatten(&r.result, self.region),
                result: r.result.is_success().then_some(&r.result),
                error: r.result.error.as_deref(),
            })
            .collect();

        let rendered = match entries.as_slice() {
            [single] => serde_json::to_string_pretty(single),
            _ => serde_json::to_string_pretty(&entries),
        };
        rendered.unwrap_or_else(|_| "[]".to_string())
    }

    // Table formatting

    fn table_single(&self, resolution: &Resolution) -> String {
        let result = &resolution.result;
        let mut lines = vec![format!("Product:         {}", resolution.label)];

        if let Some(reason) = &result.error {
            lines.push(format!("Status:          error ({})", reason));
            return lines.join("\n");
        }

        let money = |amount: u64| format!("{} {}", self.region.currency(), format_money(amount, self.region));

        match &result.optimal {
            Some(optimal) => lines.push(format!(
                "Optimal price:   {} ({}, shipped by {}, sold by {})",
                money(optimal.total),
                optimal.condition,
                optimal.shipper,
                optimal.seller
            )),
            None => lines.push(format!("Optimal price:   {}", NOT_AVAILABLE)),
        }

        lines.push(format!(
            "Stock:           {} (real stock {}, inventory score {})",
            if result.stock_sufficient() { "sufficient" } else { "insufficient" },
            result.buy_box.real_stock,
            result.inventory_score
        ));
        lines.push(format!(
            "Sellers:         {} in band / {} total ({} FBA, {} FBM)",
            result.effective_sellers_count, result.total_offers, result.fba_count, result.fbm_count
        ));

        let buy_box = &result.buy_box.offer;
        let buy_box_price = buy_box.price.map_or_else(|| NOT_AVAILABLE.to_string(), money);
        lines.push(format!(
            "Buy box:         {} (shipped by {}, sold by {})",
            buy_box_price, buy_box.shipper, buy_box.seller
        ));

        if !result.offers.is_empty() {
            lines.push(String::new());
            lines.push(format!("{:>12}  {:>10}  {:<20}  {}", "Price", "Shipping", "Shipper", "Seller"));
            lines.push(format!("{:-<12}  {:-<10}  {:-<20}  {:-<20}", "", "", "", ""));
            for offer in result.offers.iter().take(row::MAX_DISPLAY_OFFERS) {
                let price = offer.price.map(money).unwrap_or_default();
                lines.push(format!(
                    "{:>12}  {:>10}  {:<20}  {}",
                    price,
                    format_money(offer.shipping_fee, self.region),
                    truncate(&offer.shipper, 20),
                    offer.seller
                ));
            }
        }

        lines.join("\n")
    }

    fn table_summary(&self, resolutions: &[Resolution]) -> String {
        let label_width = 40;
        let mut lines = Vec::new();

        lines.push(format!(
            "{:<label_width$}  {:>12}  {:<12}  {:>7}  {:>6}",
            "Product", "Optimal", "Stock", "Sellers", "Offers"
        ));
        lines.push(format!(
            "{:-<label_width$}  {:-<12}  {:-<12}  {:-<7}  {:-<6}",
            "", "", "", "", ""
        ));

        let mut failures = 0;
        for resolution in resolutions {
            let result = &resolution.result;
            let label = truncate(&resolution.label, label_width);

            if !result.is_success() {
                failures += 1;
                lines.push(format!(
                    "{:<label_width$}  {:>12}  {:<12}  {:>7}  {:>6}",
                    label, ERROR_SENTINEL, ERROR_SENTINEL, "-", "-"
                ));
                continue;
            }

            let optimal = result
                .optimal
                .as_ref()
                .map_or_else(|| NOT_AVAILABLE.to_string(), |o| format_money(o.total, self.region));
            let stock = if result.stock_sufficient() { "sufficient" } else { "insufficient" };

            lines.push(format!(
                "{:<label_width$}  {:>12}  {:<12}  {:>7}  {:>6}",
                label, optimal, stock, result.effective_sellers_count, result.total_offers
            ));
        }

        lines.push(String::new());
        lines.push(format!("Total: {} products ({} failed)", resolutions.len(), failures));

        lines.join("\n")
    }

    // Markdown formatting

    fn markdown(&self, resolutions: &[Resolution]) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "| Product | Optimal ({}) | Condition | Seller | Stock | Sellers | Offers |",
            self.region.currency()
        ));
        lines.push("|---------|---------|-----------|--------|-------|---------|--------|".to_string());

        for resolution in resolutions {
            let result = &resolution.result;
            let label = resolution.label.replace('|', "\\|");

            if !result.is_success() {
                lines.push(format!("| {} | {} | | | | | |", label, ERROR_SENTINEL));
                continue;
            }

            let (price, condition, seller) = match &result.optimal {
                Some(o) => (format_money(o.total, self.region), o.condition.to_string(), o.seller.clone()),
                None => (NOT_AVAILABLE.to_string(), String::new(), String::new()),
            };
            let stock = if result.stock_sufficient() { "sufficient" } else { "insufficient" };

            lines.push(format!(
                "| {} | {} | {} | {} | {} | {} | {} |",
                label,
                price,
                condition,
                seller.replace('|', "\\|"),
                stock,
                result.effective_sellers_count,
                result.total_offers
            ));
        }

        lines.push(String::new());
        lines.push(format!("*{} products resolved*", resolutions.len()));

        lines.join("\n")
    }

    // CSV formatting

    fn csv_header(&self) -> String {
        let mut names = vec!["product".to_string()];
        names.extend(column_names());
        names.join(",")
    }

    fn csv(&self, resolutions: &[Resolution]) -> String {
        let mut lines = vec![self.csv_header()];

        for resolution in resolutions {
            let mut cells = vec![Self::csv_escape(&resolution.label)];
            cells.extend(flatten(&resolution.result, self.region).iter().map(|c| Self::csv_escape(c)));
            lines.push(cells.join(","));
        }

        lines.join("\n")
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        s.to_string()
    }
}
