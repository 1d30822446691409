//! Photo → identification → sold comparables, one step after the other.
//!
//! Only the first usable search query is priced. Fanning out over every
//! suggested query is not done.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marketplace_client::{MarketplaceClient, MarketplaceError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;
use valuation_core::{ComparablesReport, Identification};
use vision_client::{VisionClient, VisionError};

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Identification failed: {0}")]
    Vision(#[from] VisionError),
    #[error("Price lookup failed: {0}")]
    Marketplace(#[from] MarketplaceError),
    #[error("No search query could be derived from the identification")]
    NoSearchQuery,
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Identifies the item in a photo.
#[async_trait]
pub trait ItemIdentifier: Send + Sync {
    async fn identify(
        &self,
        image: &[u8],
        mime_type: &str,
        description: &str,
    ) -> std::result::Result<Identification, VisionError>;
}

/// Looks up sold comparables for a search term.
#[async_trait]
pub trait ComparablesSource: Send + Sync {
    async fn search(
        &self,
        query: &str,
        country: Option<&str>,
        max_age_days: Option<i64>,
    ) -> std::result::Result<ComparablesReport, MarketplaceError>;
}

#[async_trait]
impl ItemIdentifier for VisionClient {
    async fn identify(
        &self,
        image: &[u8],
        mime_type: &str,
        description: &str,
    ) -> std::result::Result<Identification, VisionError> {
        VisionClient::identify(self, image, mime_type, description).await
    }
}

#[async_trait]
impl ComparablesSource for MarketplaceClient {
    async fn search(
        &self,
        query: &str,
        country: Option<&str>,
        max_age_days: Option<i64>,
    ) -> std::result::Result<ComparablesReport, MarketplaceError> {
        MarketplaceClient::search(self, query, country, max_age_days).await
    }
}

/// Pipeline progress, in the order the stages are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationStage {
    Upload,
    Identify,
    PriceLookup,
    Done,
}

impl ValuationStage {
    /// Rough completion percentage when the stage is entered
    pub fn progress(&self) -> u8 {
        match self {
            ValuationStage::Upload => 10,
            ValuationStage::Identify => 35,
            ValuationStage::PriceLookup => 65,
            ValuationStage::Done => 100,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ValuationStage::Upload => "📤 Uploading image...",
            ValuationStage::Identify => "🧠 Analyzing image...",
            ValuationStage::PriceLookup => "💰 Fetching sold prices...",
            ValuationStage::Done => "✅ Complete!",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValuationRequest {
    pub image: Vec<u8>,
    pub mime_type: String,
    pub description: String,
    pub country: Option<String>,
    pub max_age_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValuationReport {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub identification: Identification,
    /// The search term that was priced
    pub query: String,
    pub comparables: ComparablesReport,
}

pub struct ValuationOrchestrator {
    identifier: Arc<dyn ItemIdentifier>,
    comparables: Arc<dyn ComparablesSource>,
}

impl ValuationOrchestrator {
    pub fn new(identifier: Arc<dyn ItemIdentifier>, comparables: Arc<dyn ComparablesSource>) -> Self {
        Self {
            identifier,
            comparables,
        }
    }

    /// Run the whole pipeline, calling `on_stage` as each stage starts.
    pub async fn valuate(
        &self,
        request: &ValuationRequest,
        mut on_stage: impl FnMut(ValuationStage) + Send,
    ) -> Result<ValuationReport> {
        on_stage(ValuationStage::Upload);
        info!(
            "Valuation started ({} byte {} image)",
            request.image.len(),
            request.mime_type
        );

        on_stage(ValuationStage::Identify);
        let identification = self
            .identifier
            .identify(&request.image, &request.mime_type, &request.description)
            .await?;

        let query = search_query(&identification)?;

        on_stage(ValuationStage::PriceLookup);
        let comparables = self
            .comparables
            .search(&query, request.country.as_deref(), request.max_age_days)
            .await?;

        on_stage(ValuationStage::Done);
        info!(
            "Valuation finished for '{}': {} priced comparables",
            query, comparables.stats.count
        );

        Ok(ValuationReport {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            identification,
            query,
            comparables,
        })
    }
}

/// The search term for an identification, or `NoSearchQuery` when the model
/// gave nothing usable.
pub fn search_query(identification: &Identification) -> Result<String> {
    match identification.primary_search_query() {
        Some(query) => Ok(query.to_string()),
        None => {
            warn!("Identification produced no usable search query");
            Err(OrchestratorError::NoSearchQuery)
        }
    }
}
