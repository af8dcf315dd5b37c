//! Product detail extraction: title, price, feature bullets and the detail
//! tables of a product page, plus brand or author fields depending on mode.
//!
//! Like the offer extractor this never fails. A missing block leaves its
//! field empty.

use crate::amazon::parser::{digits_only, first_text, Parser};
use crate::amazon::selectors::details;
use regex_lite::Regex;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::{debug, trace};

static ASIN_IN_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?:dp|gp/product)/([A-Z0-9]{10})").unwrap());

/// Trailing "(...)" or "[...]" qualifier of a title.
static TITLE_QUALIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.+?\)$|\s*\[.+?\]$").unwrap());

/// Cleaned detail keys (whitespace removed) that get their own fields.
const RANK_KEYS: &[&str] = &["売れ筋ランキング", "BestSellersRank"];
const REVIEW_KEYS: &[&str] = &["カスタマーレビュー", "CustomerReviews"];
const AUTHOR_KEYS: &[&str] = &["著者", "Author"];

/// Book format keys whose value usually holds the page count, most likely first.
const PAGE_FORMAT_KEYS: &[&str] = &[
    "単行本",
    "文庫",
    "ペーパーバック",
    "単行本（ソフトカバー）",
    "大型本",
    "Paperback",
    "Hardcover",
    "Printlength",
];
const PAGE_MARKERS: &[&str] = &["ページ", "pages"];

/// Left-to-right and right-to-left marks Amazon puts around detail keys.
const DIRECTION_MARKS: [char; 2] = ['\u{200e}', '\u{200f}'];

/// Which extra fields to read from a product page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailMode {
    /// General merchandise: brand from the byline
    #[default]
    Electronics,
    /// Books: author and page count
    Book,
}

impl FromStr for DetailMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "electronics" | "general" => Ok(DetailMode::Electronics),
            "book" | "books" => Ok(DetailMode::Book),
            _ => Err(format!("Unknown detail mode: {}. Use: electronics, book", s)),
        }
    }
}

impl fmt::Display for DetailMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailMode::Electronics => write!(f, "electronics"),
            DetailMode::Book => write!(f, "book"),
        }
    }
}

/// One key/value row of a product detail table or list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

/// Descriptive fields of one product page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub asin: Option<String>,
    pub title: String,
    /// Whole currency units of the displayed price
    pub price: Option<u64>,
    pub features: Vec<String>,
    /// Detail rows in page order; the first occurrence of a key wins
    pub attributes: Vec<Attribute>,
    pub best_sellers_rank: Option<String>,
    pub rating: Option<String>,
    pub review_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<String>,
}

impl ProductDetails {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.iter().find(|a| a.key == key).map(|a| a.value.as_str())
    }

    fn insert_attribute(&mut self, key: String, value: String) {
        if key.is_empty() || self.attribute(&key).is_some() {
            return;
        }
        trace!("Detail attribute {} = {}", key, value);
        self.attributes.push(Attribute { key, value });
    }

    fn attribute_matching(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.attribute(key))
    }
}

impl Parser {
    /// Reads the descriptive fields of a product page. `url` is the page
    /// address the ASIN is taken from.
    pub fn parse_details(&self, html: &str, url: &str, mode: DetailMode) -> ProductDetails {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let mut product = ProductDetails {
            asin: asin_from_url(url),
            title: first_text(&root, &details::TITLE).map(|t| clean_title(&t)).unwrap_or_default(),
            price: first_text(&root, &details::PRICE_WHOLE)
                .and_then(|text| digits_only(&text).parse().ok()),
            features: feature_bullets(&document),
            ..ProductDetails::default()
        };

        read_detail_bullets(&document, &mut product);
        for selector in details::TABLES.iter() {
            if let Some(table) = document.select(selector).next() {
                read_detail_table(table, &mut product);
            }
        }

        if product.asin.is_none() {
            product.asin = product.attribute("ASIN").map(String::from);
        }

        match mode {
            DetailMode::Book => {
                product.author = find_author(&document, &product);
                product.page_count = find_page_count(&product);
            }
            DetailMode::Electronics => {
                product.brand = first_text(&root, &details::BYLINE)
                    .map(|text| clean_brand(&text))
                    .filter(|brand| !brand.is_empty());
            }
        }

        debug!(
            "Parsed details for {:?}: {} features, {} attributes",
            product.asin,
            product.features.len(),
            product.attributes.len()
        );
        product
    }
}

/// ASIN from a `/dp/<ASIN>` or `/gp/product/<ASIN>` URL.
pub fn asin_from_url(url: &str) -> Option<String> {
    ASIN_IN_URL.captures(url).map(|caps| caps[1].to_string())
}

/// Drops a trailing parenthesised or bracketed qualifier from a title.
pub fn clean_title(title: &str) -> String {
    TITLE_QUALIFIER.replace(title.trim(), "").trim().to_string()
}

/// Strips whitespace, colons and direction marks from a detail key.
pub fn clean_key(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && !DIRECTION_MARKS.contains(c))
        .collect()
}

fn clean_value(text: &str) -> String {
    collapse_whitespace(text)
        .trim_matches(|c: char| c.is_whitespace() || DIRECTION_MARKS.contains(&c))
        .to_string()
}

fn clean_brand(byline: &str) -> String {
    byline
        .trim()
        .trim_start_matches("Brand:")
        .trim_start_matches("ブランド:")
        .trim_start_matches("Visit the")
        .trim_end_matches("Store")
        .trim_end_matches("のストアを表示")
        .trim()
        .to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: ElementRef) -> String {
    element.text().collect()
}

fn feature_bullets(document: &Html) -> Vec<String> {
    let Some(list) = document.select(&details::FEATURE_LIST).next() else {
        return Vec::new();
    };
    list.select(&details::LIST_ITEM)
        .map(|item| collapse_whitespace(&element_text(item)))
        .filter(|text| !text.is_empty())
        .collect()
}

fn read_detail_bullets(document: &Html, product: &mut ProductDetails) {
    for item in document.select(&details::BULLET_ITEMS) {
        let Some(key_element) = item.select(&details::BULLET_KEY).next() else {
            continue;
        };
        let raw_key = element_text(key_element);
        let key = clean_key(&raw_key);

        if RANK_KEYS.iter().any(|k| key.contains(k)) {
            let rank = element_text(item).replace(&raw_key, "");
            product.best_sellers_rank = Some(collapse_whitespace(&rank));
        } else if REVIEW_KEYS.iter().any(|k| key.contains(k)) {
            product.rating = first_text(&item, &details::BULLET_RATING);
            product.review_count = first_text(&item, &details::BULLET_REVIEW_COUNT);
        } else if let Some(value) = key_element
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|sibling| sibling.value().name() == "span")
        {
            product.insert_attribute(key, clean_value(&element_text(value)));
        }
    }
}

fn read_detail_table(table: ElementRef, product: &mut ProductDetails) {
    for row in table.select(&details::TABLE_ROW) {
        let labelled =
            row.select(&details::TABLE_KEY).next().zip(row.select(&details::TABLE_VALUE).next());
        let cells = labelled.or_else(|| {
            row.select(&details::TABLE_HEADER_CELL)
                .next()
                .zip(row.select(&details::TABLE_DATA_CELL).next())
        });

        if let Some((key, value)) = cells {
            product.insert_attribute(clean_key(&element_text(key)), clean_value(&element_text(value)));
        }
    }
}

/// Author from the byline links, then the "About the author" section, then
/// the detail rows. First source with a name wins.
fn find_author(document: &Html, product: &ProductDetails) -> Option<String> {
    let mut byline_authors: Vec<String> = Vec::new();
    for link in document.select(&details::BYLINE_AUTHORS) {
        let name = collapse_whitespace(&element_text(link));
        if !name.is_empty() && !byline_authors.contains(&name) {
            byline_authors.push(name);
        }
    }
    if !byline_authors.is_empty() {
        debug!("Author taken from the byline");
        return Some(byline_authors.join(", "));
    }

    if let Some(name) = first_text(&document.root_element(), &details::ABOUT_AUTHOR) {
        debug!("Author taken from the author section");
        return Some(name);
    }

    let author = product.attribute_matching(AUTHOR_KEYS).map(String::from);
    if author.is_some() {
        debug!("Author taken from the detail rows");
    }
    author
}

fn find_page_count(product: &ProductDetails) -> Option<String> {
    let mentions_pages = |value: &str| PAGE_MARKERS.iter().any(|m| value.contains(m));

    PAGE_FORMAT_KEYS
        .iter()
        .filter_map(|key| product.attribute(key))
        .find(|value| mentions_pages(value))
        .or_else(|| {
            product.attributes.iter().map(|a| a.value.as_str()).find(|value| mentions_pages(value))
        })
        .map(String::from)
}
