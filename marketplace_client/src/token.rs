//! OAuth application token for the eBay APIs (client-credentials grant).
//!
//! One [`TokenCache`] holds at most one token. The slot sits behind an async
//! mutex that stays locked across a grant exchange, so callers racing past an
//! expired token wait for a single exchange and share its result.

use crate::error::MarketplaceError;
use chrono::{DateTime, Duration, Utc};
use config_manager::MarketplaceConfig;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// A cached token is not handed out once it is this close to expiry.
pub const TOKEN_EXPIRY_MARGIN_SECONDS: i64 = 60;

/// Longest lifetime honoured from a grant response; longer ones are capped.
pub const MAX_TOKEN_LIFETIME_SECONDS: i64 = 7 * 24 * 60 * 60;

const TOKEN_PATH: &str = "/identity/v1/oauth2/token";

/// Source of "now" for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Usable while more than the safety margin remains before expiry.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Duration::seconds(TOKEN_EXPIRY_MARGIN_SECONDS)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Lifetime in seconds
    expires_in: i64,
    #[serde(default)]
    token_type: Option<String>,
}

pub struct TokenCache {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    slot: Mutex<Option<CachedToken>>,
    clock: Arc<dyn Clock>,
}

impl TokenCache {
    pub fn new(client: Client, config: &MarketplaceConfig) -> Self {
        Self::with_clock(client, config, Arc::new(SystemClock))
    }

    pub fn with_clock(client: Client, config: &MarketplaceConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            token_url: format!("{}{}", config.api_base_url.trim_end_matches('/'), TOKEN_PATH),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope.clone(),
            slot: Mutex::new(None),
            clock,
        }
    }

    /// Return a usable bearer token, running a grant exchange only when the
    /// cached one is missing or inside the expiry margin.
    pub async fn acquire(&self) -> Result<String, MarketplaceError> {
        let mut slot = self.slot.lock().await;
        let now = self.clock.now();

        if let Some(token) = slot.as_ref() {
            if token.is_usable_at(now) {
                debug!("Reusing cached eBay token (expires at {})", token.expires_at);
                return Ok(token.access_token.clone());
            }
            debug!("Cached eBay token expires at {}, refreshing", token.expires_at);
        }

        let token = self.exchange(now).await?;
        let access_token = token.access_token.clone();
        *slot = Some(token);

        Ok(access_token)
    }

    /// Drop the cached token so the next `acquire` runs a fresh exchange.
    pub async fn invalidate(&self) {
        if self.slot.lock().await.take().is_some() {
            debug!("Cached eBay token invalidated");
        }
    }

    /// Drop the cached token only if it is still `rejected`. A token another
    /// caller has already refreshed is kept.
    pub async fn invalidate_rejected(&self, rejected: &str) {
        let mut slot = self.slot.lock().await;
        if slot
            .as_ref()
            .is_some_and(|token| token.access_token == rejected)
        {
            *slot = None;
            debug!("Rejected eBay token invalidated");
        } else {
            debug!("Rejected eBay token already replaced, keeping cached token");
        }
    }

    /// Snapshot of the cached token, if any.
    pub async fn cached(&self) -> Option<CachedToken> {
        self.slot.lock().await.clone()
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<CachedToken, MarketplaceError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(MarketplaceError::ConfigurationError {
                message: "Missing eBay client id / client secret".to_string(),
            });
        }

        info!("🔑 Requesting eBay application token");
        let start_time = std::time::Instant::now();

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("❌ eBay token request failed - Status: {}, Body: {}", status, body);
            return Err(MarketplaceError::UpstreamAuthError {
                status: status.as_u16(),
                body,
            });
        }

        let response_text = response.text().await?;
        let token: TokenResponse = serde_json::from_str(&response_text)?;

        info!(
            "✅ eBay token issued in {}ms (type: {}, lifetime: {}s)",
            start_time.elapsed().as_millis(),
            token.token_type.as_deref().unwrap_or("unknown"),
            token.expires_in
        );

        let lifetime = token.expires_in.clamp(0, MAX_TOKEN_LIFETIME_SECONDS);
        if lifetime != token.expires_in {
            warn!(
                "eBay token lifetime {}s out of range, using {}s",
                token.expires_in, lifetime
            );
        }

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(lifetime),
        })
    }
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
