//! Batch input: product URL pairs or single product pages, read from a file
//! or built from ASINs.

use crate::amazon::regions::Region;
use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::{debug, info};

/// Consecutive empty or invalid rows that end a batch.
pub const MAX_CONSECUTIVE_EMPTY: usize = 10;

/// Main product page and offers panel of one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPair {
    pub label: String,
    pub main_url: String,
    pub panel_url: String,
}

impl ProductPair {
    pub fn new(main_url: impl Into<String>, panel_url: impl Into<String>) -> Self {
        let main_url = main_url.into();
        Self { label: main_url.clone(), main_url, panel_url: panel_url.into() }
    }

    /// Builds both page URLs for an ASIN in the given region.
    pub fn from_asin(asin: &str, region: Region) -> Result<Self> {
        let asin = normalize_asin(asin)?;
        Ok(Self { main_url: region.product_url(&asin), panel_url: region.offers_url(&asin), label: asin })
    }
}

/// A single product page, for the detail and image commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPage {
    pub label: String,
    pub url: String,
}

impl ProductPage {
    /// Accepts a product URL as given, or builds one from an ASIN.
    pub fn parse(input: &str, region: Region) -> Result<Self> {
        let input = input.trim();
        if input.starts_with("http") {
            return Ok(Self { label: input.to_string(), url: input.to_string() });
        }
        let asin = normalize_asin(input)?;
        Ok(Self { url: region.product_url(&asin), label: asin })
    }
}

/// Validates an ASIN (10 alphanumeric characters) and uppercases it.
pub fn normalize_asin(asin: &str) -> Result<String> {
    let asin = asin.trim().to_uppercase();
    if asin.len() != 10 || !asin.chars().all(|c| c.is_ascii_alphanumeric()) {
        bail!("Invalid ASIN format: '{}'. ASIN should be 10 alphanumeric characters.", asin);
    }
    Ok(asin)
}

/// Reads URL pairs from a file.
pub fn read_pairs(path: impl AsRef<Path>) -> Result<Vec<ProductPair>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;

    let pairs = parse_pairs(&content);
    info!("Read {} product pairs from {}", pairs.len(), path.display());
    Ok(pairs)
}

/// Parses `main_url,panel_url` lines (comma or tab separated).
///
/// Blank lines, `#` comments and rows without two `http` URLs count as
/// empty. Parsing stops after [`MAX_CONSECUTIVE_EMPTY`] empty rows in a row.
pub fn parse_pairs(content: &str) -> Vec<ProductPair> {
    take_rows(content, parse_line)
}

/// Reads product page URLs from a file, one per line.
pub fn read_pages(path: impl AsRef<Path>) -> Result<Vec<ProductPage>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;

    let pages = parse_pages(&content);
    info!("Read {} product pages from {}", pages.len(), path.display());
    Ok(pages)
}

/// Parses one product URL per line. Only the first comma or tab separated
/// field is read, so pair files work too. Empty rows end the batch as in
/// [`parse_pairs`].
pub fn parse_pages(content: &str) -> Vec<ProductPage> {
    take_rows(content, |line| {
        let url = line.split([',', '\t']).next()?.trim();
        url.starts_with("http").then(|| ProductPage { label: url.to_string(), url: url.to_string() })
    })
}

/// Collects parsed rows until [`MAX_CONSECUTIVE_EMPTY`] empty rows in a row.
fn take_rows<T>(content: &str, parse: impl Fn(&str) -> Option<T>) -> Vec<T> {
    let mut rows = Vec::new();
    let mut empty_run = 0;

    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        let parsed = if line.is_empty() || line.starts_with('#') { None } else { parse(line) };
        match parsed {
            Some(row) => {
                empty_run = 0;
                rows.push(row);
            }
            None => {
                empty_run += 1;
                debug!("Line {} is empty or invalid ({}/{})", number + 1, empty_run, MAX_CONSECUTIVE_EMPTY);
                if empty_run >= MAX_CONSECUTIVE_EMPTY {
                    info!("Stopping at line {}: {} empty rows in a row", number + 1, empty_run);
                    break;
                }
            }
        }
    }

    rows
}

fn parse_line(line: &str) -> Option<ProductPair> {
    let mut fields = line.split([',', '\t']).map(str::trim);
    let main_url = fields.next().filter(|u| u.starts_with("http"))?;
    let panel_url = fields.next().filter(|u| u.starts_with("http"))?;
    Some(ProductPair::new(main_url, panel_url))
}
