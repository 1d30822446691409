use crate::{ListingRecord, PriceStats};
use rust_decimal::{Decimal, RoundingStrategy};

/// Currency reported when the listings give no usable hint.
pub const FALLBACK_CURRENCY: &str = "GBP";

/// Listing currency that is never reported; the fallback is used instead.
pub const EXCLUDED_CURRENCY: &str = "USD";

/// Median of `values`; `None` for an empty slice.
pub fn median(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        let (low, high) = (sorted[mid - 1], sorted[mid]);
        let two = Decimal::from(2);
        let midpoint = match low.checked_add(high) {
            Some(sum) => sum / two,
            // low <= high, so the half-gap never overshoots `high`
            None => match high.checked_sub(low) {
                Some(gap) => low + gap / two,
                None => low / two + high / two,
            },
        };
        Some(midpoint)
    }
}

/// Mean of a non-empty slice, `None` when it cannot be represented.
fn mean(prices: &[Decimal]) -> Option<Decimal> {
    let count = Decimal::from(prices.len());
    match prices
        .iter()
        .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(*p))
    {
        Some(sum) => Some(sum / count),
        None => prices
            .iter()
            .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(*p / count)),
    }
}

/// Price statistics over the listings that carry a numeric price.
pub fn aggregate(listings: &[ListingRecord]) -> PriceStats {
    let prices: Vec<Decimal> = listings.iter().filter_map(|l| l.price).collect();
    let count = prices.len();

    let avg = if count == 0 {
        None
    } else {
        mean(&prices).map(|m| m.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    };

    PriceStats {
        count,
        min: prices.iter().copied().min(),
        max: prices.iter().copied().max(),
        avg,
        median: median(&prices),
        currency: report_currency(listings),
    }
}

/// The first listing decides the currency, unless it is missing or excluded.
fn report_currency(listings: &[ListingRecord]) -> String {
    listings
        .first()
        .and_then(|l| l.currency.as_deref())
        .filter(|c| !c.is_empty() && *c != EXCLUDED_CURRENCY)
        .unwrap_or(FALLBACK_CURRENCY)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn listing(price: Option<Decimal>, currency: Option<&str>) -> ListingRecord {
        ListingRecord {
            title: Some("Test listing".to_string()),
            price,
            currency: currency.map(|c| c.to_string()),
            condition: Some("Used".to_string()),
            url: None,
            image: None,
            end_time: None,
            buying_options: vec![],
        }
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[dec!(5)]), Some(dec!(5)));
        assert_eq!(median(&[dec!(1), dec!(3)]), Some(dec!(2)));
        assert_eq!(median(&[dec!(1), dec!(2), dec!(3)]), Some(dec!(2)));
    }

    #[test]
    fn test_median_sorts_input() {
        assert_eq!(median(&[dec!(9), dec!(1), dec!(4)]), Some(dec!(4)));
        assert_eq!(median(&[dec!(40), dec!(10), dec!(30), dec!(20)]), Some(dec!(25)));
    }

    #[test]
    fn test_aggregate_four_prices() {
        let listings: Vec<ListingRecord> = [10, 20, 30, 40]
            .iter()
            .map(|p| listing(Some(Decimal::from(*p)), Some("GBP")))
            .collect();

        let stats = aggregate(&listings);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, Some(dec!(10)));
        assert_eq!(stats.max, Some(dec!(40)));
        assert_eq!(stats.avg, Some(dec!(25.00)));
        assert_eq!(stats.median, Some(dec!(25)));
        assert_eq!(stats.currency, "GBP");
    }

    #[test]
    fn test_aggregate_empty() {
        let stats = aggregate(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.min, None);
        assert_eq!(stats.max, None);
        assert_eq!(stats.avg, None);
        assert_eq!(stats.median, None);
        assert_eq!(stats.currency, FALLBACK_CURRENCY);
    }

    #[test]
    fn test_aggregate_skips_unpriced_listings() {
        let listings = vec![
            listing(None, Some("EUR")),
            listing(Some(dec!(12.50)), Some("EUR")),
            listing(Some(dec!(7.25)), Some("EUR")),
        ];

        let stats = aggregate(&listings);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.min, Some(dec!(7.25)));
        assert_eq!(stats.max, Some(dec!(12.50)));
        assert_eq!(stats.avg, Some(dec!(9.88)));
        assert_eq!(stats.currency, "EUR");
    }

    #[test]
    fn test_aggregate_rounds_average_to_two_places() {
        let listings = vec![
            listing(Some(dec!(1)), Some("GBP")),
            listing(Some(dec!(1)), Some("GBP")),
            listing(Some(dec!(2)), Some("GBP")),
        ];
        assert_eq!(aggregate(&listings).avg, Some(dec!(1.33)));
    }

    #[test]
    fn test_excluded_or_missing_currency_uses_fallback() {
        let usd = vec![listing(Some(dec!(5)), Some("USD"))];
        assert_eq!(aggregate(&usd).currency, FALLBACK_CURRENCY);

        let missing = vec![listing(Some(dec!(5)), None)];
        assert_eq!(aggregate(&missing).currency, FALLBACK_CURRENCY);
    }

    #[test]
    fn test_prices_near_decimal_max_do_not_overflow() {
        let listings = vec![
            listing(Some(Decimal::MAX), Some("GBP")),
            listing(Some(Decimal::MAX), Some("GBP")),
        ];

        let stats = aggregate(&listings);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.max, Some(Decimal::MAX));
        assert_eq!(stats.median, Some(Decimal::MAX));
    }

    #[test]
    fn test_large_sum_still_averages() {
        let half = Decimal::MAX / Decimal::from(2);
        let listings = vec![
            listing(Some(half), Some("GBP")),
            listing(Some(half), Some("GBP")),
            listing(Some(half), Some("GBP")),
        ];

        let stats = aggregate(&listings);
        assert_eq!(stats.count, 3);
        assert!(stats.avg.is_some());
        assert_eq!(stats.median, Some(half));
    }

    #[test]
    fn test_median_of_extremes_stays_in_range() {
        assert_eq!(median(&[Decimal::MIN, Decimal::MAX]), Some(Decimal::ZERO));
        assert_eq!(median(&[Decimal::MAX, Decimal::MAX]), Some(Decimal::MAX));
    }
}
