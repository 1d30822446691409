use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] ConfigError),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

/// Plain environment variables honoured on top of the `VALUER__*` namespace.
const LEGACY_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("EBAY_CLIENT_ID", "ebay.client_id"),
    ("EBAY_CLIENT_SECRET", "ebay.client_secret"),
    ("EBAY_SCOPE", "ebay.scope"),
    ("EBAY_DEFAULT_COUNTRY", "ebay.default_country"),
    ("GEMINI_API_KEY", "gemini.api_key"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// eBay Browse API configuration (sold comparables)
    pub ebay: MarketplaceConfig,

    /// Gemini configuration (item identification from photos)
    pub gemini: VisionConfig,

    /// API server configuration
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    /// OAuth client id. Empty means "not configured"; checked per request.
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// OAuth scope requested in the client-credentials grant
    pub scope: String,

    /// Buyer country used when a request does not name one (ISO 3166 alpha-2)
    pub default_country: String,

    /// eBay API base URL (token and browse endpoints hang off it)
    pub api_base_url: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Listings requested per search
    pub result_limit: u32,

    /// Listings echoed back as samples alongside the stats
    pub sample_limit: usize,

    /// Sold window used when a request does not name one
    pub default_max_age_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Gemini API key
    pub api_key: String,

    /// Generative Language API base URL, including the version segment
    pub api_base_url: String,

    /// Model used for identification
    pub model: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,

    /// Largest accepted multipart upload, in bytes
    pub max_upload_bytes: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            ebay: MarketplaceConfig {
                client_id: "".to_string(), // Must be set in .env or config file
                client_secret: "".to_string(),
                scope: "https://api.ebay.com/oauth/api_scope".to_string(),
                default_country: "GB".to_string(),
                api_base_url: "https://api.ebay.com".to_string(),
                request_timeout_seconds: 30,
                result_limit: 50,
                sample_limit: 8,
                default_max_age_days: 60,
            },
            gemini: VisionConfig {
                api_key: "".to_string(), // Must be set in .env or config file
                api_base_url: "https://generativelanguage.googleapis.com/v1".to_string(),
                model: "gemini-2.5-pro".to_string(),
                request_timeout_seconds: 120,
            },
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                max_upload_bytes: 10 * 1024 * 1024,
            },
        }
    }
}

impl MarketplaceConfig {
    /// Validate eBay configuration. Credentials are not checked
    /// here: a missing id/secret only fails the requests that need a token.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_seconds == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.result_limit == 0 || self.result_limit > 200 {
            return Err(ConfigurationError::InvalidValue(
                "eBay result limit must be between 1 and 200".to_string(),
            ));
        }

        if self.sample_limit == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Sample limit must be greater than 0".to_string(),
            ));
        }

        normalize_country_code(&self.default_country).map_err(ConfigurationError::InvalidValue)?;

        Ok(())
    }

    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

impl VisionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_seconds == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Gemini model name is required".to_string(),
            ));
        }

        Ok(())
    }
}

impl SystemConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config_builder = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&SystemConfig::default())?);

        if config_path.as_ref().exists() {
            info!(
                "Loading configuration from: {}",
                config_path.as_ref().display()
            );
            config_builder = config_builder.add_source(File::from(config_path.as_ref()));
        } else {
            debug!("Config file not found, using defaults and environment variables");
        }

        config_builder = config_builder.add_source(
            Environment::with_prefix("VALUER")
                .try_parsing(true)
                .separator("__"),
        );

        for (var, key) in LEGACY_ENV_OVERRIDES {
            let value = std::env::var(var).ok().filter(|v| !v.is_empty());
            if value.is_some() {
                debug!("Applying {} from environment", var);
            }
            config_builder = config_builder.set_override_option(*key, value)?;
        }

        let mut system_config: SystemConfig = config_builder.build()?.try_deserialize()?;

        system_config.ebay.default_country =
            normalize_country_code(&system_config.ebay.default_country)
                .map_err(ConfigurationError::InvalidValue)?;

        system_config.validate()?;

        Ok(system_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.ebay.validate()?;
        self.gemini.validate()?;

        if self.api.port == 0 {
            return Err(ConfigurationError::InvalidValue(
                "API port cannot be 0".to_string(),
            ));
        }

        if self.api.max_upload_bytes == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Upload limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Normalize a buyer country to the upper-case two-letter form eBay filters expect.
pub fn normalize_country_code(input: &str) -> std::result::Result<String, String> {
    let code = input.trim().to_ascii_uppercase();
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(format!("Unsupported country code: '{}'", input))
    }
}
