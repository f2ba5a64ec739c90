//! Refinement planner
//!
//! The planner walks a tree whose root is the unfiltered query. A node whose
//! reported total exceeds the threshold is split on the next unbound
//! dimension of the refinement order, one child per legal value. Nodes at or
//! under the threshold are leaves and are handed to the caller together with
//! their already-open drainer, so page 1 is never fetched twice.
//!
//! The walk is depth-first with an explicit stack. Each split binds one more
//! dimension, so the depth never exceeds the length of the refinement order.

use crate::catalog::FilterCatalog;
use crate::config::Config;
use crate::crawler::drainer::PageDrainer;
use crate::crawler::fetcher::NoticeSource;
use crate::query::{FilterDimension, Query};
use crate::FetchError;

/// Knobs that shape the refinement tree
#[derive(Debug, Clone)]
pub struct PlannerSettings {
    /// Largest reported total drained without refinement
    pub threshold: u64,

    /// Upper bound on pages per drained query
    pub page_ceiling: u32,

    /// Order in which dimensions are added
    pub order: Vec<FilterDimension>,
}

impl PlannerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            threshold: config.api.threshold,
            page_ceiling: config.api.page_ceiling,
            order: config.planner.refinement_order.clone(),
        }
    }
}

/// One node of the refinement frontier
pub enum PlannedQuery<'a, S: NoticeSource + ?Sized> {
    /// Reported total is within the threshold
    Safe(PageDrainer<'a, S>),

    /// Over the threshold with nothing left to split on; drained best-effort
    Exhausted(PageDrainer<'a, S>),

    /// The probe itself failed; the subtree was not explored
    ProbeFailed { query: Query, error: FetchError },
}

impl<'a, S: NoticeSource + ?Sized> PlannedQuery<'a, S> {
    pub fn query(&self) -> &Query {
        match self {
            Self::Safe(drainer) | Self::Exhausted(drainer) => drainer.query(),
            Self::ProbeFailed { query, .. } => query,
        }
    }
}

/// Lazily produces the refinement frontier
pub struct RefinementPlanner<'a, S: NoticeSource + ?Sized> {
    source: &'a S,
    catalog: &'a FilterCatalog,
    settings: PlannerSettings,
    stack: Vec<Query>,
    probes: u64,
    splits: u64,
}

impl<'a, S: NoticeSource + ?Sized> RefinementPlanner<'a, S> {
    pub fn new(source: &'a S, catalog: &'a FilterCatalog, settings: PlannerSettings) -> Self {
        Self {
            source,
            catalog,
            settings,
            stack: vec![Query::unfiltered()],
            probes: 0,
            splits: 0,
        }
    }

    /// Probe requests issued so far
    pub fn probes(&self) -> u64 {
        self.probes
    }

    /// Oversized queries that were split so far
    pub fn splits(&self) -> u64 {
        self.splits
    }

    /// Queries still waiting to be probed
    pub fn pending(&self) -> usize {
        self.stack.len()
    }

    /// Returns the next frontier node, or `None` once the tree is exhausted
    pub async fn next(&mut self) -> Option<PlannedQuery<'a, S>> {
        while let Some(query) = self.stack.pop() {
            self.probes += 1;

            let drainer =
                match PageDrainer::open(self.source, query.clone(), self.settings.page_ceiling)
                    .await
                {
                    Ok(drainer) => drainer,
                    Err(error) => {
                        tracing::warn!(query = %query, error = %error, "Probe failed");
                        return Some(PlannedQuery::ProbeFailed { query, error });
                    }
                };

            let total = drainer.reported_total();
            if total <= self.settings.threshold {
                tracing::debug!(query = %query, total, "Safe query");
                return Some(PlannedQuery::Safe(drainer));
            }

            let Some(dimension) = query.next_unbound(&self.settings.order) else {
                tracing::warn!(
                    query = %query,
                    total,
                    threshold = self.settings.threshold,
                    "Query still over threshold with every dimension bound"
                );
                return Some(PlannedQuery::Exhausted(drainer));
            };

            let children: Vec<Query> = dimension
                .values(self.catalog)
                .into_iter()
                .filter_map(|value| query.extend(dimension, value))
                .collect();

            if children.is_empty() {
                tracing::warn!(
                    query = %query,
                    total,
                    dimension = %dimension,
                    "No values to split on"
                );
                return Some(PlannedQuery::Exhausted(drainer));
            }

            tracing::info!(
                query = %query,
                total,
                dimension = %dimension,
                children = children.len(),
                "Refining oversized query"
            );
            self.splits += 1;

            // Reversed so the first value is probed first
            self.stack.extend(children.into_iter().rev());
        }

        None
    }
}
