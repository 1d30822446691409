use crate::{
    error::MarketplaceError,
    token::{Clock, SystemClock, TokenCache},
    types::{SearchRequest, SearchResponse},
};
use config_manager::MarketplaceConfig;
use reqwest::{header::ACCEPT, Client};
use retry_utils::{retry_with_recovery, RetryConfig, RetryableError};
use std::sync::Arc;
use tokio::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use valuation_core::{aggregate, ComparablesReport, ListingRecord};

const SEARCH_PATH: &str = "/buy/browse/v1/item_summary/search";

/// eBay Browse client for recently sold comparables.
#[derive(Debug)]
pub struct MarketplaceClient {
    client: Client,
    search_url: String,
    tokens: TokenCache,
    default_country: String,
    default_max_age_days: i64,
    result_limit: u32,
    sample_limit: usize,
    retry_config: RetryConfig,
}

impl MarketplaceClient {
    pub fn new(config: MarketplaceConfig) -> Result<Self, MarketplaceError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build a client whose token cache reads time from `clock`
    pub fn with_clock(
        config: MarketplaceConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, MarketplaceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        let tokens = TokenCache::with_clock(client.clone(), &config, clock);

        Ok(Self {
            search_url: format!("{}{}", config.api_base_url.trim_end_matches('/'), SEARCH_PATH),
            client,
            tokens,
            default_country: config.default_country,
            default_max_age_days: config.default_max_age_days,
            result_limit: config.result_limit,
            sample_limit: config.sample_limit,
            // One retry, only after a 401, with a freshly issued token
            retry_config: RetryConfig::default(),
        })
    }

    /// Search sold listings for `query` and summarize their prices.
    ///
    /// `country` and `max_age_days` fall back to the configured defaults; the
    /// window is clamped to 1..=180 days. Only the first `sample_limit`
    /// listings are returned, in upstream order, but the stats cover all of them.
    pub async fn search(
        &self,
        query: &str,
        country: Option<&str>,
        max_age_days: Option<i64>,
    ) -> Result<ComparablesReport, MarketplaceError> {
        let request = SearchRequest::new(
            query,
            country.unwrap_or(&self.default_country),
            max_age_days.unwrap_or(self.default_max_age_days),
            self.result_limit,
        )?;

        info!(
            "🔍 Searching sold comparables: '{}' (country: {}, last {} days)",
            request.query, request.country, request.max_age_days
        );

        let listings = self.fetch_listings(&request).await?;
        let stats = aggregate(&listings);

        info!(
            "✅ {} listings, {} priced (median: {:?} {})",
            listings.len(),
            stats.count,
            stats.median,
            stats.currency
        );

        let samples = listings.into_iter().take(self.sample_limit).collect();

        Ok(ComparablesReport {
            query: request.query,
            country: request.country,
            max_age_days: request.max_age_days,
            stats,
            samples,
        })
    }

    /// Run the search, retrying once with a fresh token if the current one is rejected.
    async fn fetch_listings(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<ListingRecord>, MarketplaceError> {
        let tokens = &self.tokens;
        // Token sent by the latest attempt
        let last_token = &Mutex::new(None::<String>);

        retry_with_recovery(
            move || async move {
                let token = tokens.acquire().await?;
                *last_token.lock().await = Some(token.clone());
                self.fetch_once(request, &token).await
            },
            move || async move {
                if let Some(rejected) = last_token.lock().await.take() {
                    tokens.invalidate_rejected(&rejected).await;
                }
                Ok(())
            },
            &self.retry_config,
            |e: &MarketplaceError| {
                if e.is_unauthorized() {
                    RetryableError::Unauthorized
                } else {
                    RetryableError::Other
                }
            },
        )
        .await
    }

    async fn fetch_once(
        &self,
        request: &SearchRequest,
        token: &str,
    ) -> Result<Vec<ListingRecord>, MarketplaceError> {
        debug!("🌐 GET {} {:?}", self.search_url, request.query_params());
        let start_time = std::time::Instant::now();

        let response = self
            .client
            .get(&self.search_url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .query(&request.query_params())
            .send()
            .await?;

        let status = response.status();
        debug!(
            "📨 eBay search response: {} in {}ms",
            status,
            start_time.elapsed().as_millis()
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 401 {
                warn!("eBay rejected the bearer token: {}", body);
            } else {
                error!("❌ eBay API error - Status: {}, Body: {}", status, body);
            }
            return Err(MarketplaceError::UpstreamFetchError {
                status: status.as_u16(),
                body,
            });
        }

        let response_text = response.text().await?;
        let search_response: SearchResponse = match serde_json::from_str(&response_text) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("❌ Failed to parse eBay search response: {}", e);
                error!(
                    "🔍 Response snippet: {}",
                    &response_text.chars().take(500).collect::<String>()
                );
                return Err(MarketplaceError::JsonError(e));
            }
        };

        debug!(
            "📊 eBay reports {} total matches",
            search_response.total.unwrap_or_default()
        );

        Ok(search_response
            .item_summaries
            .unwrap_or_default()
            .into_iter()
            .map(ListingRecord::from)
            .collect())
    }
}
