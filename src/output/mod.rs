//! Output module for run summaries and reports
//!
//! This module handles:
//! - The end-of-run summary and its console rendering
//! - Markdown export of the summary
//! - The dry-run outline of the refinement tree

mod markdown;
mod plan;
mod summary;

pub use markdown::{format_markdown_summary, write_markdown_summary};
pub use plan::{print_plan, PlanLevel, PlanOutline};
pub use summary::{print_summary, CrawlSummary};
