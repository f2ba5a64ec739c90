//! Sweep coordinator - main crawl orchestration logic
//!
//! The coordinator pulls frontier queries from the refinement planner,
//! drains each one, filters records through the run's dedup state and hands
//! new records to the publisher. Each query is processed behind its own error
//! boundary so one bad slice never ends the run. A cancellation token is
//! checked between queries; the publisher buffer is flushed before `run`
//! returns either way.

use crate::catalog::FilterCatalog;
use crate::config::Config;
use crate::crawler::drainer::{DrainStatus, PageDrainer};
use crate::crawler::fetcher::{HttpFetcher, NoticeSource};
use crate::crawler::planner::{PlannedQuery, PlannerSettings, RefinementPlanner};
use crate::output::CrawlSummary;
use crate::publish::{CleanRecord, Connector, NatsConnector, ReconnectPolicy, ReliablePublisher};
use crate::state::{Admission, CrawlState, UnresolvedReason};
use crate::SweepError;
use chrono::Utc;
use reqwest::Client;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Main sweep coordinator structure
pub struct Coordinator<S: NoticeSource, C: Connector> {
    source: S,
    catalog: FilterCatalog,
    settings: PlannerSettings,
    publisher: ReliablePublisher<C>,
    cancel: CancellationToken,
}

impl<S: NoticeSource, C: Connector> Coordinator<S, C> {
    pub fn new(
        source: S,
        catalog: FilterCatalog,
        settings: PlannerSettings,
        publisher: ReliablePublisher<C>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            catalog,
            settings,
            publisher,
            cancel,
        }
    }

    /// Runs the sweep until the planner is exhausted or the token fires
    ///
    /// The summary always reflects what happened, including an early stop.
    pub async fn run(self) -> CrawlSummary {
        let Self {
            source,
            catalog,
            settings,
            mut publisher,
            cancel,
        } = self;

        let started_at = Utc::now();
        let clock = Instant::now();
        tracing::info!(
            threshold = settings.threshold,
            page_ceiling = settings.page_ceiling,
            catalog_codes = catalog.len(),
            "Starting sweep"
        );

        let mut state = CrawlState::new();
        let mut planner = RefinementPlanner::new(&source, &catalog, settings);

        // Start connecting while the first probes run
        publisher.reconcile().await;

        let mut queries_visited: u64 = 0;
        let mut cancelled = false;

        loop {
            if cancel.is_cancelled() {
                tracing::warn!(
                    pending = planner.pending(),
                    "Stop requested, leaving remaining queries unvisited"
                );
                cancelled = true;
                break;
            }

            let Some(planned) = planner.next().await else {
                tracing::info!("Refinement tree exhausted, sweep complete");
                break;
            };

            queries_visited += 1;
            process_query(planned, &mut state, &mut publisher).await;

            if queries_visited % 10 == 0 {
                tracing::info!(
                    queries = queries_visited,
                    pending = planner.pending(),
                    accepted = state.records_accepted,
                    buffered = publisher.buffered(),
                    connection = %publisher.state(),
                    "Progress: {:.1} queries/sec",
                    queries_visited as f64 / clock.elapsed().as_secs_f64().max(f64::EPSILON)
                );
            }
        }

        let probes = planner.probes();
        let splits = planner.splits();
        drop(planner);

        let buffered = publisher.flush().await;

        tracing::info!(
            queries = queries_visited,
            accepted = state.records_accepted,
            delivered = publisher.delivered(),
            buffered,
            unresolved = state.unresolved().len(),
            "Sweep finished in {:?}",
            clock.elapsed()
        );

        CrawlSummary {
            started_at,
            finished_at: Utc::now(),
            cancelled,
            queries_visited,
            probes,
            splits,
            queries_drained: state.queries_drained,
            pages_fetched: state.pages_fetched,
            records_seen: state.records_seen,
            records_accepted: state.records_accepted,
            duplicates: state.duplicates,
            malformed: state.malformed,
            truncated_drains: state.truncated_drains,
            delivered: publisher.delivered(),
            buffered,
            unresolved: state.into_unresolved(),
        }
    }
}

/// Handles one frontier node; failures end up in the unresolved list
async fn process_query<S, C>(
    planned: PlannedQuery<'_, S>,
    state: &mut CrawlState,
    publisher: &mut ReliablePublisher<C>,
) where
    S: NoticeSource + ?Sized,
    C: Connector,
{
    let (mut drainer, over_threshold) = match planned {
        PlannedQuery::Safe(drainer) => (drainer, false),
        PlannedQuery::Exhausted(drainer) => {
            state.mark_unresolved(
                drainer.query().clone(),
                UnresolvedReason::OverThreshold {
                    total: drainer.reported_total(),
                },
            );
            (drainer, true)
        }
        PlannedQuery::ProbeFailed { query, error } => {
            state.mark_unresolved(
                query,
                UnresolvedReason::ProbeFailed {
                    error: error.to_string(),
                },
            );
            return;
        }
    };

    tracing::debug!(
        query = %drainer.query(),
        total = drainer.reported_total(),
        max_pages = drainer.max_pages(),
        "Draining query"
    );
    state.queries_drained += 1;

    let outcome = drain_into(&mut drainer, state, publisher).await;
    state.pages_fetched += u64::from(drainer.pages_fetched());

    match drainer.status().clone() {
        DrainStatus::Failed { page, error } => {
            state.mark_unresolved(
                drainer.query().clone(),
                UnresolvedReason::DrainFailed { page, error },
            );
        }
        // Nothing was drained, so the whole slice is missing
        DrainStatus::Truncated { page: 1, reason } if !over_threshold => {
            state.mark_unresolved(
                drainer.query().clone(),
                UnresolvedReason::MalformedFirstPage {
                    total: drainer.reported_total(),
                    reason,
                },
            );
        }
        DrainStatus::Truncated { .. } => state.truncated_drains += 1,
        DrainStatus::InProgress | DrainStatus::Complete => {}
    }

    if let Err(e) = outcome {
        tracing::error!(query = %drainer.query(), error = %e, "Error processing query");
        state.mark_unresolved(
            drainer.query().clone(),
            UnresolvedReason::ProcessingFailed {
                error: e.to_string(),
            },
        );
    }
}

async fn drain_into<S, C>(
    drainer: &mut PageDrainer<'_, S>,
    state: &mut CrawlState,
    publisher: &mut ReliablePublisher<C>,
) -> Result<(), SweepError>
where
    S: NoticeSource + ?Sized,
    C: Connector,
{
    while let Some(batch) = drainer.next_batch().await {
        for notice in &batch {
            match state.admit(notice) {
                Admission::Accepted(identity) => {
                    let Some(record) = CleanRecord::from_notice(notice) else {
                        continue;
                    };
                    publisher.publish(&record).await?;
                    tracing::trace!(identity = %identity, "Record handed off");
                }
                Admission::Duplicate => {}
                Admission::Malformed => {
                    tracing::debug!(query = %drainer.query(), "Record without identity dropped");
                }
            }
        }
    }
    Ok(())
}

/// Runs a complete sweep against the configured API and broker
///
/// # Arguments
///
/// * `config` - The loaded configuration
/// * `client` - HTTP client built from the `[user-agent]` section
/// * `catalog` - Country codes for the country dimensions
/// * `cancel` - Stops the sweep between queries when cancelled
pub async fn run_sweep(
    config: &Config,
    client: Client,
    catalog: FilterCatalog,
    cancel: CancellationToken,
) -> Result<CrawlSummary, SweepError> {
    let fetcher = HttpFetcher::from_config(client, config)?;
    let connector = NatsConnector::from_config(&config.publisher).with_client_name(format!(
        "{}/{}",
        config.user_agent.crawler_name, config.user_agent.crawler_version
    ));
    let publisher = ReliablePublisher::new(
        connector,
        ReconnectPolicy::from_config(&config.publisher),
    )
    .with_confirm_batch(config.publisher.confirm_batch);

    let coordinator = Coordinator::new(
        fetcher,
        catalog,
        PlannerSettings::from_config(config),
        publisher,
        cancel,
    );
    Ok(coordinator.run().await)
}
