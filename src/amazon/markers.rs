//! Locale text markers used when reading offer pages.
//!
//! Each marketplace prints availability, condition and shipping in its own
//! language. Stock readings are an ordered rule list: the first rule that
//! matches wins, so the order below is part of the parsing contract.

use regex_lite::Regex;
use std::sync::LazyLock;

/// Stock count reported for a plain "in stock" phrase (no exact count shown).
pub const IN_STOCK_SENTINEL: u32 = 30;

/// How a matching stock rule turns availability text into a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockReading {
    /// The phrase carries no number; report this fixed count.
    Fixed(u32),
    /// The first capture group holds the remaining count.
    Captured,
}

/// A single availability pattern.
#[derive(Debug)]
pub struct StockRule {
    pattern: Regex,
    reading: StockReading,
}

impl StockRule {
    fn new(pattern: &str, reading: StockReading) -> Self {
        Self { pattern: Regex::new(pattern).expect("stock rule pattern must compile"), reading }
    }

    /// Returns the stock count if this rule matches the text.
    pub fn read(&self, text: &str) -> Option<u32> {
        let caps = self.pattern.captures(text)?;
        match self.reading {
            StockReading::Fixed(count) => Some(count),
            StockReading::Captured => caps.get(1)?.as_str().parse().ok(),
        }
    }
}

/// Text markers for one page language.
#[derive(Debug)]
pub struct Markers {
    /// Condition heading marker for used offers.
    pub used: &'static str,
    /// Condition heading marker for new offers.
    pub new: &'static str,
    /// Shipping text marker for free delivery (matched case-insensitively).
    pub free: &'static str,
    /// Shipper text marker for platform-fulfilled (FBA) offers.
    pub platform_fulfilment: &'static str,
    stock_rules: Vec<StockRule>,
}

static JAPANESE: LazyLock<Markers> = LazyLock::new(|| Markers {
    used: "中古",
    new: "新品",
    free: "無料",
    platform_fulfilment: "Amazon",
    stock_rules: vec![
        StockRule::new("在庫あり", StockReading::Fixed(IN_STOCK_SENTINEL)),
        StockRule::new(r"残り\s*(\d+)\s*点", StockReading::Captured),
    ],
});

static ENGLISH: LazyLock<Markers> = LazyLock::new(|| Markers {
    used: "Used",
    new: "New",
    free: "free",
    platform_fulfilment: "Amazon",
    stock_rules: vec![
        StockRule::new(r"(?i)^\s*in stock\.?\s*$", StockReading::Fixed(IN_STOCK_SENTINEL)),
        StockRule::new(r"(?i)only\s+(\d+)\s+left in stock", StockReading::Captured),
    ],
});

impl Markers {
    pub fn japanese() -> &'static Markers {
        &JAPANESE
    }

    pub fn english() -> &'static Markers {
        &ENGLISH
    }

    /// Reads a stock count from availability text, first matching rule wins.
    pub fn read_stock(&self, text: &str) -> Option<u32> {
        self.stock_rules.iter().find_map(|rule| rule.read(text))
    }

    pub fn is_used(&self, condition_text: &str) -> bool {
        condition_text.contains(self.used)
    }

    pub fn is_new(&self, condition_text: &str) -> bool {
        condition_text.contains(self.new)
    }

    pub fn is_free(&self, shipping_text: &str) -> bool {
        shipping_text.to_lowercase().contains(&self.free.to_lowercase())
    }

    pub fn is_platform_fulfilled(&self, shipper: &str) -> bool {
        shipper.contains(self.platform_fulfilment)
    }
}
