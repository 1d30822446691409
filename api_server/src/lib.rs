use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use config_manager::SystemConfig;
use marketplace_client::{MarketplaceClient, MarketplaceError};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;
use valuation_orchestrator::{OrchestratorError, ValuationOrchestrator};
use vision_client::{VisionClient, VisionError};

pub mod handlers;
pub mod types;

use handlers::*;
use types::ErrorResponse;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: SystemConfig,
    pub vision: Arc<VisionClient>,
    pub marketplace: Arc<MarketplaceClient>,
    pub orchestrator: Arc<ValuationOrchestrator>,
}

/// Main application error type
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Vision(#[from] VisionError),
    #[error("{0}")]
    Marketplace(#[from] MarketplaceError),
    #[error("{0}")]
    Orchestrator(#[from] OrchestratorError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    PayloadTooLarge(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Vision(e) => vision_status(e),
            ApiError::Marketplace(e) => marketplace_status(e),
            ApiError::Orchestrator(OrchestratorError::Vision(e)) => vision_status(e),
            ApiError::Orchestrator(OrchestratorError::Marketplace(e)) => marketplace_status(e),
            ApiError::Orchestrator(OrchestratorError::NoSearchQuery) => StatusCode::BAD_REQUEST,
        }
    }
}

fn vision_status(error: &VisionError) -> StatusCode {
    match error {
        VisionError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn marketplace_status(error: &MarketplaceError) -> StatusCode {
    match error {
        MarketplaceError::InvalidSearch { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = self.to_string();

        if status.is_server_error() {
            error!("Request failed: {}", error_message);
        } else {
            warn!("Request rejected ({}): {}", status.as_u16(), error_message);
        }

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}

/// Construct the upstream clients and the pipeline from configuration.
pub fn build_state(config: SystemConfig) -> Result<AppState, ApiError> {
    let vision = Arc::new(VisionClient::new(config.gemini.clone())?);
    let marketplace = Arc::new(MarketplaceClient::new(config.ebay.clone())?);
    let orchestrator = Arc::new(ValuationOrchestrator::new(
        vision.clone(),
        marketplace.clone(),
    ));

    Ok(AppState {
        config,
        vision,
        marketplace,
        orchestrator,
    })
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.config.api.max_upload_bytes;

    Router::new()
        .route("/health", get(health_check))
        .route("/api/identify", post(identify_item))
        .route("/api/comps", post(get_comparables))
        .route("/api/valuate", post(valuate_item))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(state)
}

/// Install the global subscriber. `RUST_LOG` wins over `default_filter`;
/// `VALUER_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let json = std::env::var("VALUER_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
