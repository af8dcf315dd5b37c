//! Amazon marketplaces, their currency units and page locale.

use crate::amazon::markers::Markers;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marketplaces whose offer pages the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Jp,
    Us,
    Uk,
    Ca,
    Au,
}

impl Region {
    /// Returns the Amazon domain for this region.
    pub fn domain(&self) -> &'static str {
        match self {
            Region::Jp => "amazon.co.jp",
            Region::Us => "amazon.com",
            Region::Uk => "amazon.co.uk",
            Region::Ca => "amazon.ca",
            Region::Au => "amazon.com.au",
        }
    }

    /// Returns the base URL for this region.
    pub fn base_url(&self) -> String {
        format!("https://www.{}", self.domain())
    }

    /// Returns the currency code for this region.
    pub fn currency(&self) -> &'static str {
        match self {
            Region::Jp => "JPY",
            Region::Us => "USD",
            Region::Uk => "GBP",
            Region::Ca => "CAD",
            Region::Au => "AUD",
        }
    }

    /// Returns the Accept-Language header value for this region.
    pub fn accept_language(&self) -> &'static str {
        match self {
            Region::Jp => "ja-JP,ja;q=0.9,en;q=0.8",
            Region::Us | Region::Ca | Region::Au => "en-US,en;q=0.9",
            Region::Uk => "en-GB,en;q=0.9",
        }
    }

    /// Number of minor-unit digits of the region's currency (yen has none).
    pub fn minor_digits(&self) -> u32 {
        match self {
            Region::Jp => 0,
            _ => 2,
        }
    }

    /// Text markers used by this region's pages.
    pub fn markers(&self) -> &'static Markers {
        match self {
            Region::Jp => Markers::japanese(),
            _ => Markers::english(),
        }
    }

    /// Product detail page (buy-box) URL for an ASIN.
    pub fn product_url(&self, asin: &str) -> String {
        format!("{}/dp/{}", self.base_url(), asin)
    }

    /// All-offers panel URL for an ASIN.
    pub fn offers_url(&self, asin: &str) -> String {
        format!("{}/dp/{}?aod=1", self.base_url(), asin)
    }

    /// Returns all supported regions.
    pub fn all() -> &'static [Region] {
        &[Region::Jp, Region::Us, Region::Uk, Region::Ca, Region::Au]
    }

    fn code(&self) -> &'static str {
        match self {
            Region::Jp => "jp",
            Region::Us => "us",
            Region::Uk => "uk",
            Region::Ca => "ca",
            Region::Au => "au",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Region {
    type Err = RegionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jp" | "japan" => Ok(Region::Jp),
            "us" | "usa" => Ok(Region::Us),
            "uk" | "gb" => Ok(Region::Uk),
            "ca" | "canada" => Ok(Region::Ca),
            "au" | "australia" => Ok(Region::Au),
            _ => Err(RegionParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegionParseError(String);

impl fmt::Display for RegionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let valid: Vec<&str> = Region::all().iter().map(Region::code).collect();
        write!(f, "Unknown region '{}'. Valid regions: {}", self.0, valid.join(", "))
    }
}

impl std::error::Error for RegionParseError {}
