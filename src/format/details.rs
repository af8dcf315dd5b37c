//! Output for the product detail command.

use super::{truncate, Formatter, ERROR_SENTINEL};
use crate::amazon::details::{DetailMode, ProductDetails};
use crate::config::OutputFormat;
use serde::Serialize;

/// Details of one product page, or why they could not be read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailsEntry {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ProductDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetailsEntry {
    pub fn new(label: impl Into<String>, outcome: anyhow::Result<ProductDetails>) -> Self {
        let (details, error) = match outcome {
            Ok(details) => (Some(details), None),
            Err(e) => (None, Some(format!("{:#}", e))),
        };
        Self { label: label.into(), details, error }
    }
}

/// CSV columns after the product label, by mode.
pub fn detail_columns(mode: DetailMode) -> Vec<&'static str> {
    let mut columns = vec!["asin", "title"];
    match mode {
        DetailMode::Electronics => columns.push("brand"),
        DetailMode::Book => columns.extend(["author", "page_count"]),
    }
    columns.extend(["price", "features", "best_sellers_rank", "rating", "review_count", "attributes"]);
    columns
}

fn detail_cells(details: &ProductDetails, mode: DetailMode) -> Vec<String> {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();

    let mut cells = vec![text(&details.asin), details.title.clone()];
    match mode {
        DetailMode::Electronics => cells.push(text(&details.brand)),
        DetailMode::Book => cells.extend([text(&details.author), text(&details.page_count)]),
    }
    cells.push(details.price.map(|p| p.to_string()).unwrap_or_default());
    cells.push(details.features.join("\n"));
    cells.push(text(&details.best_sellers_rank));
    cells.push(text(&details.rating));
    cells.push(text(&details.review_count));
    cells.push(
        details
            .attributes
            .iter()
            .map(|a| format!("{}: {}", a.key, a.value))
            .collect::<Vec<_>>()
            .join(" | "),
    );
    cells
}

impl Formatter {
    /// Formats product details in the configured output format.
    pub fn format_details(&self, entries: &[DetailsEntry], mode: DetailMode) -> String {
        match self.format {
            OutputFormat::Json => {
                let rendered = match entries {
                    [single] => serde_json::to_string_pretty(single),
                    _ => serde_json::to_string_pretty(entries),
                };
                rendered.unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Csv => self.details_csv(entries, mode),
            _ if entries.is_empty() => "No products read.".to_string(),
            OutputFormat::Table => self.details_table(entries, mode),
            OutputFormat::Markdown => self.details_markdown(entries, mode),
        }
    }

    fn details_table(&self, entries: &[DetailsEntry], mode: DetailMode) -> String {
        let blocks: Vec<String> = entries
            .iter()
            .map(|entry| {
                let mut lines = vec![format!("Product:     {}", entry.label)];
                let Some(details) = &entry.details else {
                    lines.push(format!("Status:      error ({})", entry.error.as_deref().unwrap_or("unknown")));
                    return lines.join("\n");
                };

                lines.push(format!("Title:       {}", details.title));
                if let Some(price) = details.price {
                    lines.push(format!("Price:       {} {}", self.region.currency(), price));
                }
                match mode {
                    DetailMode::Electronics => {
                        if let Some(brand) = &details.brand {
                            lines.push(format!("Brand:       {}", brand));
                        }
                    }
                    DetailMode::Book => {
                        if let Some(author) = &details.author {
                            lines.push(format!("Author:      {}", author));
                        }
                        if let Some(pages) = &details.page_count {
                            lines.push(format!("Pages:       {}", pages));
                        }
                    }
                }
                if let Some(rating) = &details.rating {
                    let reviews = details.review_count.as_deref().unwrap_or("-");
                    lines.push(format!("Rating:      {} ({})", rating, reviews));
                }
                if let Some(rank) = &details.best_sellers_rank {
                    lines.push(format!("Rank:        {}", rank));
                }

                if !details.features.is_empty() {
                    lines.push(String::new());
                    lines.extend(details.features.iter().map(|f| format!("  - {}", f)));
                }
                if !details.attributes.is_empty() {
                    lines.push(String::new());
                    let width = details.attributes.iter().map(|a| a.key.chars().count()).max().unwrap_or(0);
                    lines.extend(
                        details.attributes.iter().map(|a| format!("  {:<width$}  {}", a.key, a.value)),
                    );
                }
                lines.join("\n")
            })
            .collect();

        blocks.join("\n\n")
    }

    fn details_markdown(&self, entries: &[DetailsEntry], mode: DetailMode) -> String {
        let byline = match mode {
            DetailMode::Electronics => "Brand",
            DetailMode::Book => "Author",
        };
        let escape = |s: &str| s.replace('|', "\\|");

        let mut lines = vec![
            format!("| Product | Title | Price ({}) | {} | Rating |", self.region.currency(), byline),
            "|---------|-------|-------|-------|--------|".to_string(),
        ];

        for entry in entries {
            let label = escape(&entry.label);
            let Some(details) = &entry.details else {
                lines.push(format!("| {} | {} | | | |", label, ERROR_SENTINEL));
                continue;
            };
            let by = match mode {
                DetailMode::Electronics => details.brand.as_deref(),
                DetailMode::Book => details.author.as_deref(),
            };
            lines.push(format!(
                "| {} | {} | {} | {} | {} |",
                label,
                escape(&truncate(&details.title, 60)),
                details.price.map(|p| p.to_string()).unwrap_or_default(),
                escape(by.unwrap_or_default()),
                details.rating.as_deref().unwrap_or_default()
            ));
        }

        lines.join("\n")
    }

    fn details_csv(&self, entries: &[DetailsEntry], mode: DetailMode) -> String {
        let columns = detail_columns(mode);
        let mut header = vec!["product"];
        header.extend(&columns);
        let mut lines = vec![header.join(",")];

        for entry in entries {
            let mut cells = vec![Self::csv_escape(&entry.label)];
            match &entry.details {
                Some(details) => {
                    cells.extend(detail_cells(details, mode).iter().map(|c| Self::csv_escape(c)))
                }
                None => cells.extend(columns.iter().map(|_| ERROR_SENTINEL.to_string())),
            }
            lines.push(cells.join(","));
        }

        lines.join("\n")
    }
}
