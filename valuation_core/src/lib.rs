//! Domain model and pure computations shared by the item valuer crates:
//! listing/price-statistics types, the price aggregator and the parser for
//! the vision model's free-form identification text.

pub mod identification;
pub mod stats;

pub use identification::{parse_identification, ParseError};
pub use stats::{aggregate, median, EXCLUDED_CURRENCY, FALLBACK_CURRENCY};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Shortest sold window a search may ask for, in days.
pub const MIN_MAX_AGE_DAYS: i64 = 1;

/// Longest sold window a search may ask for, in days.
pub const MAX_MAX_AGE_DAYS: i64 = 180;

/// Clamp a requested sold window into `[MIN_MAX_AGE_DAYS, MAX_MAX_AGE_DAYS]`.
pub fn clamp_max_age_days(days: i64) -> u32 {
    days.clamp(MIN_MAX_AGE_DAYS, MAX_MAX_AGE_DAYS) as u32
}

/// One sold listing, normalized from the marketplace's item summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub title: Option<String>,
    /// `None` when the listing carried no price or an unparseable one
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub condition: Option<String>,
    pub url: Option<String>,
    pub image: Option<String>,
    pub end_time: Option<String>,
    #[serde(default)]
    pub buying_options: Vec<String>,
}

/// Summary statistics over the priced listings of one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    pub count: usize,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
    /// Mean rounded to 2 decimal places
    pub avg: Option<Decimal>,
    pub median: Option<Decimal>,
    pub currency: String,
}

/// Result of a comparables search, echoing the effective inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparablesReport {
    pub query: String,
    pub country: String,
    pub max_age_days: u32,
    pub stats: PriceStats,
    pub samples: Vec<ListingRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemAttributes {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
}

/// Structured identification as requested from the vision model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentificationResult {
    pub item: String,
    #[serde(default)]
    pub attributes: ItemAttributes,
    #[serde(default)]
    pub search_queries: Vec<String>,
}

/// What the vision model told us about the photo. The model answers in prose,
/// so a structured result is not guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identification {
    Identified(IdentificationResult),
    /// No parseable JSON object in the model output; the text is kept verbatim.
    Unstructured { raw: String },
}

impl Identification {
    /// Search term to price with: the first non-blank suggested query, else the item name.
    pub fn primary_search_query(&self) -> Option<&str> {
        match self {
            Identification::Identified(result) => result
                .search_queries
                .iter()
                .map(|q| q.trim())
                .find(|q| !q.is_empty())
                .or_else(|| Some(result.item.trim()).filter(|item| !item.is_empty())),
            Identification::Unstructured { .. } => None,
        }
    }
}

/// Parse a marketplace price string ("12.99"). Anything unparseable is treated as absent.
pub fn parse_price(value: &str) -> Option<Decimal> {
    Decimal::from_str(value.trim()).ok()
}
