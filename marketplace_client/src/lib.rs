pub mod client;
pub mod error;
pub mod token;
pub mod types;

pub use client::MarketplaceClient;
pub use error::MarketplaceError;
pub use token::{
    CachedToken, Clock, SystemClock, TokenCache, MAX_TOKEN_LIFETIME_SECONDS,
    TOKEN_EXPIRY_MARGIN_SECONDS,
};
pub use types::{SearchRequest, SOLD_ITEMS_FILTER};

// Re-export the config the client is built from
pub use config_manager::MarketplaceConfig;
