use crate::query::{FilterDimension, DEFAULT_REFINEMENT_ORDER};
use serde::Deserialize;

/// Main configuration structure for Notice-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub publisher: PublisherConfig,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
}

/// Source API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApiConfig {
    /// Search endpoint that accepts the filter query parameters
    pub base_url: String,

    /// Largest reported total that is still drained without refinement
    #[serde(default = "default_threshold")]
    pub threshold: u64,

    /// Upper bound on pages fetched for a single query
    #[serde(default = "default_page_ceiling")]
    pub page_ceiling: u32,

    /// Pause after every successful request (milliseconds)
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Pause after an exhausted-quota signal before re-issuing (seconds)
    #[serde(default = "default_rate_limit_cooldown_secs")]
    pub rate_limit_cooldown_secs: u64,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Retry budgets for failed API requests
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Attempts per request while a query is still coarse
    #[serde(default = "default_probe_attempts")]
    pub probe_attempts: u32,

    /// Attempts per request once a query binds an initial-letter dimension
    #[serde(default = "default_leaf_attempts")]
    pub leaf_attempts: u32,

    /// Fixed pause between attempts (milliseconds)
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            probe_attempts: default_probe_attempts(),
            leaf_attempts: default_leaf_attempts(),
            retry_interval_ms: default_retry_interval_ms(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Message broker configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PublisherConfig {
    /// Broker address, e.g. `nats://localhost:4222`
    pub server_url: String,

    /// Subject every record is published on
    pub subject: String,

    /// Stream declared to capture the subject
    pub stream: String,

    /// Connection attempts per reconnect cycle
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,

    /// Pause between connection attempts (milliseconds)
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    /// Records handed to the broker before it must confirm them
    #[serde(default = "default_confirm_batch")]
    pub confirm_batch: usize,
}

/// Where the country code list comes from
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CatalogConfig {
    /// Inline country codes; takes precedence over `page-url`
    #[serde(default)]
    pub codes: Vec<String>,

    /// Page carrying a `<select name="nationality">` element to scrape
    #[serde(default)]
    pub page_url: Option<String>,
}

/// Refinement planner configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlannerConfig {
    /// Order in which dimensions are added to an oversized query
    #[serde(default = "default_refinement_order")]
    pub refinement_order: Vec<FilterDimension>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            refinement_order: default_refinement_order(),
        }
    }
}

fn default_threshold() -> u64 {
    160
}

fn default_page_ceiling() -> u32 {
    20
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_rate_limit_cooldown_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_probe_attempts() -> u32 {
    1
}

fn default_leaf_attempts() -> u32 {
    3
}

fn default_retry_interval_ms() -> u64 {
    5000
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_interval_ms() -> u64 {
    5000
}

fn default_confirm_batch() -> usize {
    100
}

fn default_refinement_order() -> Vec<FilterDimension> {
    DEFAULT_REFINEMENT_ORDER.to_vec()
}
