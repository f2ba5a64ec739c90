//! State tracked while a sweep runs
//!
//! # Components
//!
//! - `CrawlState`: dedup set, counters and the unresolved frontier of one run
//! - `ConnectionState`: where the publisher stands with the broker

mod connection_state;
mod crawl_state;

pub use connection_state::ConnectionState;
pub use crawl_state::{Admission, CrawlState, UnresolvedQuery, UnresolvedReason};
