//! Run summary
//!
//! Built by the coordinator at the end of a sweep and printed by the CLI.

use crate::state::UnresolvedQuery;
use chrono::{DateTime, Utc};

/// Summary statistics for one sweep
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Stopped early by a cancellation request
    pub cancelled: bool,

    // Refinement
    pub queries_visited: u64,
    pub probes: u64,
    pub splits: u64,
    pub queries_drained: u64,
    pub pages_fetched: u64,

    // Records
    pub records_seen: u64,
    pub records_accepted: u64,
    pub duplicates: u64,
    pub malformed: u64,
    pub truncated_drains: u64,

    // Delivery
    pub delivered: u64,
    pub buffered: usize,

    /// Queries that could not be fully enumerated, in discovery order
    pub unresolved: Vec<UnresolvedQuery>,
}

impl CrawlSummary {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    /// Share of seen records that were duplicates, in percent
    pub fn duplicate_rate(&self) -> f64 {
        if self.records_seen == 0 {
            0.0
        } else {
            (self.duplicates as f64 / self.records_seen as f64) * 100.0
        }
    }

    /// True when nothing was left unresolved, undelivered or unvisited
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.unresolved.is_empty() && self.buffered == 0
    }
}

/// Prints the summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Sweep Summary ===\n");

    println!("Run:");
    println!("  Started: {}", summary.started_at.to_rfc3339());
    println!("  Finished: {}", summary.finished_at.to_rfc3339());
    println!("  Duration: {} seconds", summary.duration_seconds());
    if summary.cancelled {
        println!("  Stopped early on request");
    }
    println!();

    println!("Refinement:");
    println!("  Queries visited: {}", summary.queries_visited);
    println!("  Probes issued: {}", summary.probes);
    println!("  Queries split: {}", summary.splits);
    println!("  Queries drained: {}", summary.queries_drained);
    println!("  Pages fetched: {}", summary.pages_fetched);
    println!();

    println!("Records:");
    println!("  Seen: {}", summary.records_seen);
    println!("  Accepted: {}", summary.records_accepted);
    println!(
        "  Duplicates dropped: {} ({:.1}%)",
        summary.duplicates,
        summary.duplicate_rate()
    );
    println!("  Without identity: {}", summary.malformed);
    if summary.truncated_drains > 0 {
        println!("  Drains cut short by malformed pages: {}", summary.truncated_drains);
    }
    println!();

    println!("Delivery:");
    println!("  Delivered: {}", summary.delivered);
    println!("  Still buffered: {}", summary.buffered);
    println!();

    if summary.unresolved.is_empty() {
        println!("Unresolved frontier: none");
    } else {
        println!("Unresolved frontier ({}):", summary.unresolved.len());
        for entry in &summary.unresolved {
            println!("  - {}  [{}]", entry.query, entry.reason);
        }
    }
}

#[cfg(test)]
pub(crate) mod fixture {
    use super::*;
    use crate::query::{FilterDimension, FilterValue, Query, Sex};
    use crate::state::UnresolvedReason;
    use chrono::TimeZone;

    pub fn summary() -> CrawlSummary {
        let male = Query::unfiltered()
            .extend(FilterDimension::Sex, FilterValue::Sex(Sex::Male))
            .unwrap_or_default();

        CrawlSummary {
            started_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            finished_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
            cancelled: false,
            queries_visited: 42,
            probes: 45,
            splits: 3,
            queries_drained: 41,
            pages_fetched: 130,
            records_seen: 6400,
            records_accepted: 6000,
            duplicates: 400,
            malformed: 0,
            truncated_drains: 0,
            delivered: 6000,
            buffered: 0,
            unresolved: vec![UnresolvedQuery {
                query: male,
                reason: UnresolvedReason::OverThreshold { total: 350 },
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_and_rates() {
        let summary = fixture::summary();
        assert_eq!(summary.duration_seconds(), 1800);
        assert!((summary.duplicate_rate() - 6.25).abs() < f64::EPSILON);
        assert!(!summary.is_complete());
    }

    #[test]
    fn test_empty_run_has_zero_duplicate_rate() {
        let mut summary = fixture::summary();
        summary.records_seen = 0;
        summary.duplicates = 0;
        summary.unresolved.clear();
        assert_eq!(summary.duplicate_rate(), 0.0);
        assert!(summary.is_complete());
    }
}
