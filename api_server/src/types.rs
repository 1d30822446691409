use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Standard API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub marketplace_configured: bool,
    pub vision_configured: bool,
}

/// Request body for `POST /api/comps`
#[derive(Debug, Default, Deserialize)]
pub struct ComparablesRequest {
    #[serde(default)]
    pub search_queries: Vec<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, rename = "maxAgeDays")]
    pub max_age_days: Option<i64>,
}

impl ComparablesRequest {
    /// Only the first non-blank query is searched.
    pub fn primary_query(&self) -> Option<&str> {
        self.search_queries
            .iter()
            .map(|q| q.trim())
            .find(|q| !q.is_empty())
    }
}

/// Image part of a multipart upload
#[derive(Debug)]
pub struct UploadedFile {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
}

/// Multipart upload: the `file` part plus every text field by name
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    /// Text field, `None` when absent or blank
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}
