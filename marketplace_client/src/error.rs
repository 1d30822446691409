use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketplaceError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("eBay token request failed: HTTP {status}: {body}")]
    UpstreamAuthError { status: u16, body: String },

    #[error("eBay API error: HTTP {status}: {body}")]
    UpstreamFetchError { status: u16, body: String },

    #[error("Invalid search: {message}")]
    InvalidSearch { message: String },
}

impl MarketplaceError {
    /// The search endpoint rejected our bearer token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, MarketplaceError::UpstreamFetchError { status: 401, .. })
    }
}
