use crate::error::MarketplaceError;
use config_manager::normalize_country_code;
use serde::Deserialize;
use valuation_core::{clamp_max_age_days, parse_price, ListingRecord};

/// Restricts Browse results to completed, sold listings.
pub const SOLD_ITEMS_FILTER: &str = "soldItemsOnly:true";

/// A validated comparables search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    /// Upper-case ISO 3166 alpha-2 buyer country
    pub country: String,
    /// Already clamped into the supported window
    pub max_age_days: u32,
    pub limit: u32,
}

impl SearchRequest {
    pub fn new(
        query: &str,
        country: &str,
        max_age_days: i64,
        limit: u32,
    ) -> Result<Self, MarketplaceError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MarketplaceError::InvalidSearch {
                message: "Search query is empty".to_string(),
            });
        }

        let country = normalize_country_code(country)
            .map_err(|message| MarketplaceError::InvalidSearch { message })?;

        Ok(Self {
            query: query.to_string(),
            country,
            max_age_days: clamp_max_age_days(max_age_days),
            limit,
        })
    }

    /// Comma-joined Browse filter: sold only, ended within the window, delivered to the country.
    pub fn filter(&self) -> String {
        [
            SOLD_ITEMS_FILTER.to_string(),
            format!("itemEndDate:[NOW-{}d..NOW]", self.max_age_days),
            format!("deliveryCountry:{}", self.country),
        ]
        .join(",")
    }

    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("q", self.query.clone()),
            ("limit", self.limit.to_string()),
            ("filter", self.filter()),
        ]
    }
}

/// Browse `item_summary/search` response (only the fields we use)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub item_summaries: Option<Vec<ItemSummary>>,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub title: Option<String>,
    pub price: Option<Amount>,
    pub condition: Option<String>,
    pub item_web_url: Option<String>,
    pub item_href: Option<String>,
    pub image: Option<ImageRef>,
    pub item_end_date: Option<String>,
    #[serde(default)]
    pub buying_options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Amount {
    /// eBay sends a decimal string; numbers are tolerated
    pub value: Option<serde_json::Value>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub image_url: Option<String>,
}

impl From<ItemSummary> for ListingRecord {
    fn from(item: ItemSummary) -> Self {
        let (price, currency) = match item.price {
            Some(amount) => {
                let price = match amount.value {
                    Some(serde_json::Value::String(s)) => parse_price(&s),
                    Some(serde_json::Value::Number(n)) => parse_price(&n.to_string()),
                    _ => None,
                };
                (price, amount.currency)
            }
            None => (None, None),
        };

        ListingRecord {
            title: item.title,
            price,
            currency,
            condition: item.condition,
            url: item.item_web_url.or(item.item_href),
            image: item.image.and_then(|i| i.image_url),
            end_time: item.item_end_date,
            buying_options: item.buying_options.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_filter_clauses() {
        let request = SearchRequest::new("game boy", "gb", 30, 50).unwrap();
        assert_eq!(
            request.filter(),
            "soldItemsOnly:true,itemEndDate:[NOW-30d..NOW],deliveryCountry:GB"
        );
        assert_eq!(request.query_params()[0], ("q", "game boy".to_string()));
        assert_eq!(request.query_params()[1], ("limit", "50".to_string()));
    }

    #[test]
    fn test_max_age_days_is_clamped() {
        assert_eq!(SearchRequest::new("lamp", "GB", 0, 50).unwrap().max_age_days, 1);
        assert_eq!(SearchRequest::new("lamp", "GB", 500, 50).unwrap().max_age_days, 180);
    }

    #[test]
    fn test_rejects_blank_query_and_bad_country() {
        assert!(matches!(
            SearchRequest::new("   ", "GB", 60, 50),
            Err(MarketplaceError::InvalidSearch { .. })
        ));
        assert!(matches!(
            SearchRequest::new("lamp", "Britain", 60, 50),
            Err(MarketplaceError::InvalidSearch { .. })
        ));
    }

    #[test]
    fn test_item_summary_mapping() {
        let raw = serde_json::json!({
            "itemSummaries": [
                {
                    "title": "Anglepoise lamp",
                    "price": { "value": "45.00", "currency": "GBP" },
                    "condition": "Used",
                    "itemHref": "https://api.ebay.com/buy/browse/v1/item/v1|1|0",
                    "image": { "imageUrl": "https://i.ebayimg.com/1.jpg" },
                    "itemEndDate": "2024-05-01T12:00:00.000Z",
                    "buyingOptions": ["FIXED_PRICE"]
                },
                { "title": "No price", "itemWebUrl": "https://www.ebay.co.uk/itm/2" },
                { "title": "Garbled", "price": { "value": "n/a", "currency": "GBP" } }
            ]
        });

        let response: SearchResponse = serde_json::from_value(raw).unwrap();
        let listings: Vec<ListingRecord> = response
            .item_summaries
            .unwrap_or_default()
            .into_iter()
            .map(ListingRecord::from)
            .collect();

        assert_eq!(listings.len(), 3);
        assert_eq!(listings[0].price, Some(dec!(45.00)));
        assert_eq!(listings[0].currency.as_deref(), Some("GBP"));
        assert_eq!(
            listings[0].url.as_deref(),
            Some("https://api.ebay.com/buy/browse/v1/item/v1|1|0")
        );
        assert_eq!(listings[0].image.as_deref(), Some("https://i.ebayimg.com/1.jpg"));
        assert_eq!(listings[0].buying_options, vec!["FIXED_PRICE".to_string()]);
        assert_eq!(listings[1].price, None);
        assert_eq!(listings[1].url.as_deref(), Some("https://www.ebay.co.uk/itm/2"));
        assert_eq!(listings[2].price, None);
    }

    #[test]
    fn test_missing_item_summaries() {
        let response: SearchResponse = serde_json::from_str(r#"{"total": 0}"#).unwrap();
        assert!(response.item_summaries.is_none());
    }
}
