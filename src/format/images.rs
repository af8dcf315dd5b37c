//! Output for the image URL command.

use super::{Formatter, ERROR_SENTINEL};
use crate::amazon::images::MAX_IMAGES;
use crate::config::OutputFormat;
use serde::Serialize;

/// Image URLs of one product page, or why they could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagesEntry {
    pub label: String,
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImagesEntry {
    pub fn new(label: impl Into<String>, outcome: anyhow::Result<Vec<String>>) -> Self {
        let (urls, error) = match outcome {
            Ok(urls) => (urls, None),
            Err(e) => (Vec::new(), Some(format!("{:#}", e))),
        };
        Self { label: label.into(), urls, error }
    }
}

impl Formatter {
    /// Formats image URLs in the configured output format.
    pub fn format_images(&self, entries: &[ImagesEntry]) -> String {
        match self.format {
            OutputFormat::Json => {
                let rendered = match entries {
                    [single] => serde_json::to_string_pretty(single),
                    _ => serde_json::to_string_pretty(entries),
                };
                rendered.unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Csv => self.images_csv(entries),
            _ if entries.is_empty() => "No products read.".to_string(),
            OutputFormat::Table => self.images_table(entries),
            OutputFormat::Markdown => self.images_markdown(entries),
        }
    }

    fn images_table(&self, entries: &[ImagesEntry]) -> String {
        let blocks: Vec<String> = entries
            .iter()
            .map(|entry| {
                let mut lines = vec![format!("Product: {}", entry.label)];
                if let Some(reason) = &entry.error {
                    lines.push(format!("Status:  error ({})", reason));
                } else if entry.urls.is_empty() {
                    lines.push("No images found".to_string());
                } else {
                    lines.extend(entry.urls.iter().enumerate().map(|(i, url)| format!("{:>3}. {}", i + 1, url)));
                }
                lines.join("\n")
            })
            .collect();

        blocks.join("\n\n")
    }

    fn images_markdown(&self, entries: &[ImagesEntry]) -> String {
        let mut lines =
            vec!["| Product | # | Image |".to_string(), "|---------|---|-------|".to_string()];

        for entry in entries {
            let label = entry.label.replace('|', "\\|");
            if entry.error.is_some() {
                lines.push(format!("| {} | | {} |", label, ERROR_SENTINEL));
                continue;
            }
            for (i, url) in entry.urls.iter().enumerate() {
                lines.push(format!("| {} | {} | ![]({}) |", label, i + 1, url));
            }
        }

        lines.join("\n")
    }

    fn images_csv(&self, entries: &[ImagesEntry]) -> String {
        let mut header = vec!["product".to_string()];
        header.extend((1..=MAX_IMAGES).map(|i| format!("image_url_{}", i)));
        let mut lines = vec![header.join(",")];

        for entry in entries {
            let mut cells = vec![Self::csv_escape(&entry.label)];
            if entry.error.is_some() {
                cells.extend((0..MAX_IMAGES).map(|_| ERROR_SENTINEL.to_string()));
            } else {
                cells.extend(
                    (0..MAX_IMAGES)
                        .map(|i| entry.urls.get(i).map(|u| Self::csv_escape(u)).unwrap_or_default()),
                );
            }
            lines.push(cells.join(","));
        }

        lines.join("\n")
    }
}
