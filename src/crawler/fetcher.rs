//! HTTP fetcher implementation
//!
//! This module handles every request to the search API, including:
//! - Building the HTTP client with a descriptive user agent
//! - Translating queries into request URLs
//! - Honouring the API's exhausted-quota signal
//! - Retrying transient failures under a `RetryPolicy`
//! - Classifying failures into `FetchError` kinds

use crate::config::{Config, UserAgentConfig};
use crate::crawler::envelope::{parse_page, EnvelopeError, Page};
use crate::crawler::retry::RetryPolicy;
use crate::query::{FilterDimension, Query};
use crate::{ConfigError, FetchError};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use url::Url;

/// Header carrying the number of requests left in the current quota window
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Anything that can serve result pages for a query
///
/// The planner and drainer only depend on this trait, so they can run
/// against the real API or an in-memory fixture.
#[async_trait]
pub trait NoticeSource: Send + Sync {
    /// Fetches one page (1-based) of results for a query
    async fn fetch_page(&self, query: &Query, page: u32) -> Result<Page, FetchError>;
}

/// Timing knobs for the fetcher
#[derive(Debug, Clone)]
pub struct FetcherSettings {
    /// Pause after every successful request
    pub request_delay: Duration,

    /// Pause after an exhausted-quota signal
    pub rate_limit_cooldown: Duration,

    /// Policy for queries that do not bind an initial-letter dimension yet
    pub probe_policy: RetryPolicy,

    /// Policy once a query binds an initial-letter dimension
    pub leaf_policy: RetryPolicy,
}

impl FetcherSettings {
    pub fn from_config(config: &Config) -> Self {
        let interval = Duration::from_millis(config.retry.retry_interval_ms);
        Self {
            request_delay: Duration::from_millis(config.api.request_delay_ms),
            rate_limit_cooldown: Duration::from_secs(config.api.rate_limit_cooldown_secs),
            probe_policy: RetryPolicy::new(config.retry.probe_attempts, interval),
            leaf_policy: RetryPolicy::new(config.retry.leaf_attempts, interval),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Upper bound for a whole request, body included
///
/// # Example
///
/// ```no_run
/// use notice_sweep::config::UserAgentConfig;
/// use notice_sweep::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "NoticeSweep".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Rate-limit aware, retrying client for the search API
pub struct HttpFetcher {
    client: Client,
    base_url: Url,
    settings: FetcherSettings,
}

impl HttpFetcher {
    pub fn new(client: Client, base_url: Url, settings: FetcherSettings) -> Self {
        Self {
            client,
            base_url,
            settings,
        }
    }

    /// Creates a fetcher from the loaded configuration
    pub fn from_config(client: Client, config: &Config) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.api.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;
        Ok(Self::new(
            client,
            base_url,
            FetcherSettings::from_config(config),
        ))
    }

    /// Picks the retry budget for a query
    ///
    /// Letter-level slices are expensive to re-derive, so they get the
    /// larger budget.
    pub fn policy_for(&self, query: &Query) -> &RetryPolicy {
        if query.binds(FilterDimension::ForenameInitial)
            || query.binds(FilterDimension::SurnameInitial)
        {
            &self.settings.leaf_policy
        } else {
            &self.settings.probe_policy
        }
    }

    /// Builds the request URL for a query page
    pub fn request_url(&self, query: &Query, page: u32) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query.to_params() {
                pairs.append_pair(key, &value);
            }
            pairs.append_pair("page", &page.to_string());
        }
        url
    }

    /// Fetches one page with retries, then observes the inter-request delay
    pub async fn fetch(&self, query: &Query, page: u32) -> Result<Page, FetchError> {
        let url = self.request_url(query, page);
        let label = url.as_str().to_string();
        let policy = self.policy_for(query);

        let page = policy
            .run(&label, |_attempt| self.fetch_once(&url, page))
            .await?;

        tokio::time::sleep(self.settings.request_delay).await;
        Ok(page)
    }

    /// One logical attempt: a request plus at most one re-issue after a cooldown
    async fn fetch_once(&self, url: &Url, page: u32) -> Result<Page, FetchError> {
        let mut response = self.send(url).await?;

        if is_rate_limited(&response) {
            tracing::warn!(
                url = %url,
                "Rate limit exhausted, cooling down for {:?}",
                self.settings.rate_limit_cooldown
            );
            tokio::time::sleep(self.settings.rate_limit_cooldown).await;

            response = self.send(url).await?;
            if is_rate_limited(&response) {
                return Err(FetchError::RateLimited {
                    url: url.to_string(),
                });
            }
        }

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transport {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        parse_page(&body, page).map_err(|e| match e {
            EnvelopeError::Decode(source) => FetchError::Decode {
                url: url.to_string(),
                message: source.to_string(),
            },
            EnvelopeError::Shape { message, total } => FetchError::UnexpectedShape {
                url: url.to_string(),
                message,
                total,
            },
        })
    }

    async fn send(&self, url: &Url) -> Result<Response, FetchError> {
        tracing::trace!(url = %url, "GET");
        self.client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: classify_transport_error(&e),
            })
    }
}

#[async_trait]
impl NoticeSource for HttpFetcher {
    async fn fetch_page(&self, query: &Query, page: u32) -> Result<Page, FetchError> {
        self.fetch(query, page).await
    }
}

/// Returns true if the response says the quota is used up
fn is_rate_limited(response: &Response) -> bool {
    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }

    response
        .headers()
        .get(RATE_LIMIT_REMAINING_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|remaining| remaining == 0)
}

fn classify_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else {
        error.to_string()
    }
}
