//! Crawler module for enumerating the search API
//!
//! This module contains the core sweep logic, including:
//! - HTTP fetching with rate-limit handling and retry budgets
//! - Response envelope parsing
//! - Draining every page of a query
//! - Recursive refinement of oversized queries
//! - Identity de-duplication
//! - Overall sweep coordination

mod coordinator;
mod dedup;
mod drainer;
mod envelope;
mod fetcher;
mod planner;
mod retry;

pub use coordinator::{run_sweep, Coordinator};
pub use dedup::Deduplicator;
pub use drainer::{DrainStatus, PageDrainer};
pub use envelope::{page_number_from_href, parse_page, EnvelopeError, Notice, Page};
pub use fetcher::{build_http_client, FetcherSettings, HttpFetcher, NoticeSource};
pub use planner::{PlannedQuery, PlannerSettings, RefinementPlanner};
pub use retry::RetryPolicy;
