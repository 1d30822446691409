// Gemini vision client - identifies an item from a photo and an optional hint

pub mod types;

pub use config_manager::VisionConfig;
pub use types::{mime_type_for_file_name, GenerateContentRequest, IDENTIFICATION_PROMPT};

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};
use valuation_core::{parse_identification, Identification};

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
    #[error("Gemini API error: HTTP {status}: {body}")]
    UpstreamFetchError { status: u16, body: String },
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

#[derive(Debug, Clone)]
pub struct VisionClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl VisionClient {
    pub fn new(config: VisionConfig) -> Result<Self, VisionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.api_base_url.trim_end_matches('/'),
                config.model
            ),
            api_key: config.api_key,
            model: config.model,
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Ask the model what is in the photo.
    ///
    /// Returns [`Identification::Unstructured`] rather than an error when the
    /// model's answer holds no parseable JSON object.
    pub async fn identify(
        &self,
        image: &[u8],
        mime_type: &str,
        description: &str,
    ) -> Result<Identification, VisionError> {
        if image.is_empty() {
            return Err(VisionError::InvalidInput {
                message: "Image is empty".to_string(),
            });
        }
        if mime_type.trim().is_empty() {
            return Err(VisionError::InvalidInput {
                message: "Image content type is missing".to_string(),
            });
        }
        if !self.is_configured() {
            return Err(VisionError::ConfigurationError {
                message: "Missing Gemini API key".to_string(),
            });
        }

        let request = GenerateContentRequest::identification(image, mime_type, description);

        info!(
            "🧠 Identifying {} byte {} image with {}",
            image.len(),
            mime_type,
            self.model
        );
        let start_time = std::time::Instant::now();

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("❌ Gemini API error - Status: {}, Body: {}", status, body);
            return Err(VisionError::UpstreamFetchError {
                status: status.as_u16(),
                body,
            });
        }

        let response_text = response.text().await?;
        info!(
            "📨 Gemini responded in {:.2}s ({} bytes)",
            start_time.elapsed().as_secs_f64(),
            response_text.len()
        );

        let value: Value = serde_json::from_str(&response_text)?;
        let text = answer_text(&value);
        debug!("Model answer: {}", text);

        Ok(parse_identification(&text))
    }
}

/// Text of the first candidate's first part; the whole response JSON when absent.
fn answer_text(response: &Value) -> String {
    response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| response.to_string())
}
