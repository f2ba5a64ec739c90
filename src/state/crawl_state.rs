//! Run-scoped crawl bookkeeping
//!
//! One `CrawlState` lives for one run. It owns the deduplicator, the
//! counters reported in the summary, and the queries that could not be
//! fully enumerated.

use crate::crawler::{Deduplicator, Notice};
use crate::query::Query;
use std::fmt;

/// Outcome of offering one record to the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// First sighting; carries the identity
    Accepted(String),
    /// Identity already handed off in this run
    Duplicate,
    /// Record carries no usable identity
    Malformed,
}

/// Why a query left the run incomplete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// Still over the threshold with every dimension bound
    OverThreshold { total: u64 },

    /// The page 1 probe failed; the subtree below was never explored
    ProbeFailed { error: String },

    /// Page 1 reported a total but carried no records
    MalformedFirstPage { total: u64, reason: String },

    /// A later page failed after retries
    DrainFailed { page: u32, error: String },

    /// Something went wrong while processing records of the query
    ProcessingFailed { error: String },
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OverThreshold { total } => {
                write!(f, "{} results with no dimension left to split on", total)
            }
            Self::ProbeFailed { error } => write!(f, "probe failed: {}", error),
            Self::MalformedFirstPage { total, reason } => {
                write!(f, "{} results reported but page 1 was malformed: {}", total, reason)
            }
            Self::DrainFailed { page, error } => write!(f, "page {} failed: {}", page, error),
            Self::ProcessingFailed { error } => write!(f, "processing failed: {}", error),
        }
    }
}

/// A query the run could not fully enumerate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedQuery {
    pub query: Query,
    pub reason: UnresolvedReason,
}

/// Counters and dedup state for a single run
#[derive(Debug, Default)]
pub struct CrawlState {
    dedup: Deduplicator,

    /// Records seen across all pages, duplicates included
    pub records_seen: u64,

    /// Records accepted as new
    pub records_accepted: u64,

    /// Records dropped because their identity was already seen
    pub duplicates: u64,

    /// Records dropped for lacking an identity
    pub malformed: u64,

    /// Frontier queries whose drain was started
    pub queries_drained: u64,

    /// Result pages requested while draining, probes included
    pub pages_fetched: u64,

    /// Drains that stopped early on a malformed page
    pub truncated_drains: u64,

    unresolved: Vec<UnresolvedQuery>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts the record and decides whether it is new
    pub fn admit(&mut self, notice: &Notice) -> Admission {
        self.records_seen += 1;

        let Some(identity) = notice.identity() else {
            self.malformed += 1;
            return Admission::Malformed;
        };

        if self.dedup.accept(identity) {
            self.records_accepted += 1;
            Admission::Accepted(identity.to_string())
        } else {
            self.duplicates += 1;
            Admission::Duplicate
        }
    }

    pub fn is_seen(&self, identity: &str) -> bool {
        self.dedup.contains(identity)
    }

    pub fn distinct_identities(&self) -> usize {
        self.dedup.len()
    }

    pub fn mark_unresolved(&mut self, query: Query, reason: UnresolvedReason) {
        tracing::warn!(query = %query, reason = %reason, "Query left unresolved");
        self.unresolved.push(UnresolvedQuery { query, reason });
    }

    pub fn unresolved(&self) -> &[UnresolvedQuery] {
        &self.unresolved
    }

    pub fn into_unresolved(self) -> Vec<UnresolvedQuery> {
        self.unresolved
    }
}
