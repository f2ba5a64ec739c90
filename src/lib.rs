//! Notice-Sweep: an exhaustive crawler for result-capped search APIs
//!
//! This crate enumerates every record behind a paginated search API that only
//! serves a limited number of results per query. Queries that report too many
//! results are split along a fixed sequence of filter dimensions until every
//! slice is small enough to drain, records are de-duplicated by identity, and
//! each new record is handed to a message broker through a buffering publisher
//! that survives broker outages.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod output;
pub mod publish;
pub mod query;
pub mod state;

use thiserror::Error;

/// Main error type for Notice-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Filter catalog error: {0}")]
    Catalog(String),

    #[error("Delivery channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Coarse classification of a failed API request
///
/// Retry policies decide per kind whether another attempt is worth it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The API signalled an exhausted request quota
    RateLimited,
    /// Connection error, timeout or non-2xx status
    Transport,
    /// The body was not valid JSON
    Decode,
    /// Valid JSON without the expected envelope fields
    UnexpectedShape,
}

/// Errors surfaced by the API fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Rate limit still exhausted for {url}")]
    RateLimited { url: String },

    #[error("Transport failure for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Undecodable body from {url}: {message}")]
    Decode { url: String, message: String },

    /// `total` is kept when the envelope reported one
    #[error("Unexpected response shape from {url}: {message}")]
    UnexpectedShape {
        url: String,
        message: String,
        total: Option<u64>,
    },
}

impl FetchError {
    /// Returns the failure kind used for retry decisions
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::Transport { .. } => FailureKind::Transport,
            Self::Decode { .. } => FailureKind::Decode,
            Self::UnexpectedShape { .. } => FailureKind::UnexpectedShape,
        }
    }
}

/// Errors raised by the downstream delivery channel
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Failed to connect to broker: {0}")]
    Connect(String),

    #[error("Failed to declare destination '{destination}': {message}")]
    Declare {
        destination: String,
        message: String,
    },

    #[error("Failed to deliver record {identity}: {message}")]
    Deliver { identity: String, message: String },

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Broker did not confirm handed-off records: {0}")]
    Flush(String),
}

/// Result type alias for Notice-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for fetch operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;

// Re-export commonly used types
pub use catalog::FilterCatalog;
pub use config::Config;
pub use query::{FilterDimension, FilterValue, Query};
pub use state::{ConnectionState, CrawlState};
