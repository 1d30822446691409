use crate::types::*;
use crate::{ApiError, AppState};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
};
use tracing::{debug, info};
use valuation_orchestrator::ValuationRequest;
use vision_client::mime_type_for_file_name;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        marketplace_configured: state.config.ebay.has_credentials(),
        vision_configured: state.vision.is_configured(),
    })
}

/// Identify the item in an uploaded photo
pub async fn identify_item(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_upload(multipart).await?;
    let file = require_file(&form)?;
    let description = form.field("description").unwrap_or_default();

    info!(
        "Identify request: {} ({} bytes)",
        file.file_name.as_deref().unwrap_or("upload"),
        file.bytes.len()
    );

    let identification = state
        .vision
        .identify(&file.bytes, &file.content_type, description)
        .await?;

    Ok(Json(identification))
}

/// Sold comparables for the first search query in the body
pub async fn get_comparables(
    State(state): State<AppState>,
    payload: Result<Json<ComparablesRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let query = request
        .primary_query()
        .ok_or_else(|| ApiError::BadRequest("No search_queries provided".to_string()))?;
    let country = request
        .country
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    info!(
        "Comparables request: '{}' (country: {:?}, maxAgeDays: {:?})",
        query, country, request.max_age_days
    );

    let report = state
        .marketplace
        .search(query, country, request.max_age_days)
        .await?;

    Ok(Json(report))
}

/// Identify then price an uploaded photo in one call
pub async fn valuate_item(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_upload(multipart).await?;
    let file = require_file(&form)?;

    let max_age_days = form
        .field("maxAgeDays")
        .map(|days| {
            days.parse::<i64>().map_err(|_| {
                ApiError::BadRequest(format!("maxAgeDays must be a whole number, got '{}'", days))
            })
        })
        .transpose()?;

    let request = ValuationRequest {
        image: file.bytes.clone(),
        mime_type: file.content_type.clone(),
        description: form.field("description").unwrap_or_default().to_string(),
        country: form.field("country").map(str::to_string),
        max_age_days,
    };

    let report = state
        .orchestrator
        .valuate(&request, |stage| {
            debug!("Valuation stage {:?} ({}%)", stage, stage.progress())
        })
        .await?;

    Ok(Json(report))
}

async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadForm, ApiError> {
    let mut multipart =
        multipart.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field
                .content_type()
                .filter(|ct| ct.starts_with("image/"))
                .map(str::to_string)
                .unwrap_or_else(|| {
                    mime_type_for_file_name(file_name.as_deref().unwrap_or_default()).to_string()
                });
            let bytes = field.bytes().await.map_err(multipart_error)?;

            form.file = Some(UploadedFile {
                bytes: bytes.to_vec(),
                content_type,
                file_name,
            });
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

fn require_file(form: &UploadForm) -> Result<&UploadedFile, ApiError> {
    form.file
        .as_ref()
        .filter(|file| !file.bytes.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}
