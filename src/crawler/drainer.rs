//! Page drainer: walks every result page of one query
//!
//! Page 1 is fetched when the drainer is opened, which doubles as the
//! planner's probe for the reported total. Later pages are fetched lazily,
//! one batch per `next_batch` call.

use crate::crawler::envelope::Notice;
use crate::crawler::fetcher::NoticeSource;
use crate::query::Query;
use crate::FetchError;

/// Where a drain ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainStatus {
    /// More pages may follow
    InProgress,

    /// Every reachable page was read
    Complete,

    /// A page came back structurally malformed; later pages were skipped
    Truncated { page: u32, reason: String },

    /// A page could not be fetched within its retry budget
    Failed { page: u32, error: String },
}

/// Lazy, finite reader over all pages of one query
pub struct PageDrainer<'a, S: NoticeSource + ?Sized> {
    source: &'a S,
    query: Query,
    reported_total: u64,
    max_pages: u32,
    next_page: u32,
    yielded: u64,
    pages_fetched: u32,
    first_batch: Option<Vec<Notice>>,
    status: DrainStatus,
}

impl<'a, S: NoticeSource + ?Sized> PageDrainer<'a, S> {
    /// Fetches page 1 and prepares to walk the rest
    ///
    /// `maxPages` is the page number of the `last` link (1 when absent),
    /// clamped to `page_ceiling`. A page 1 with an unexpected shape yields no
    /// records: without a reported total the query counts as empty and
    /// complete, otherwise the total is kept and the drain is truncated at
    /// page 1. Any other failure is returned to the caller.
    pub async fn open(source: &'a S, query: Query, page_ceiling: u32) -> Result<Self, FetchError> {
        let (reported_total, max_pages, first_batch, status) =
            match source.fetch_page(&query, 1).await {
                Ok(page) => {
                    let advertised = page.last_page.unwrap_or(1).max(1);
                    let max_pages = advertised.min(page_ceiling.max(1));
                    if advertised > max_pages {
                        tracing::warn!(
                            query = %query,
                            advertised,
                            ceiling = max_pages,
                            "Query advertises more pages than will be fetched"
                        );
                    }
                    (page.total, max_pages, page.notices, DrainStatus::InProgress)
                }
                Err(FetchError::UnexpectedShape {
                    url,
                    message,
                    total: Some(total),
                }) if total > 0 => {
                    tracing::warn!(
                        query = %query,
                        url = %url,
                        total,
                        "Malformed first page ({}), keeping the reported total",
                        message
                    );
                    let status = DrainStatus::Truncated {
                        page: 1,
                        reason: message,
                    };
                    (total, 1, Vec::new(), status)
                }
                Err(FetchError::UnexpectedShape { url, message, .. }) => {
                    tracing::warn!(
                        query = %query,
                        url = %url,
                        "Malformed first page ({}), treating query as empty",
                        message
                    );
                    (0, 1, Vec::new(), DrainStatus::Complete)
                }
                Err(e) => return Err(e),
            };

        Ok(Self {
            source,
            query,
            reported_total,
            max_pages,
            next_page: 2,
            yielded: 0,
            pages_fetched: 1,
            first_batch: Some(first_batch),
            status,
        })
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// The total the API reported on page 1
    pub fn reported_total(&self) -> u64 {
        self.reported_total
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Pages requested so far, page 1 included
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn status(&self) -> &DrainStatus {
        &self.status
    }

    /// Returns the next page of records, or `None` once the drain has ended
    ///
    /// Records are returned exactly as received. The drain stops at
    /// `max_pages`, once the reported total has been yielded, on an empty
    /// page, or on the first page that cannot be read.
    pub async fn next_batch(&mut self) -> Option<Vec<Notice>> {
        if let Some(batch) = self.first_batch.take() {
            self.yielded += batch.len() as u64;
            if batch.is_empty() && self.status == DrainStatus::InProgress {
                self.status = DrainStatus::Complete;
            }
            return Some(batch);
        }

        if self.status != DrainStatus::InProgress {
            return None;
        }

        if self.next_page > self.max_pages || self.yielded >= self.reported_total {
            self.status = DrainStatus::Complete;
            return None;
        }

        let page_number = self.next_page;
        self.next_page += 1;
        self.pages_fetched += 1;

        match self.source.fetch_page(&self.query, page_number).await {
            Ok(page) if page.notices.is_empty() => {
                tracing::debug!(
                    query = %self.query,
                    page = page_number,
                    "Empty page, drain complete"
                );
                self.status = DrainStatus::Complete;
                None
            }
            Ok(page) => {
                self.yielded += page.notices.len() as u64;
                Some(page.notices)
            }
            Err(FetchError::UnexpectedShape { message, .. }) => {
                tracing::warn!(
                    query = %self.query,
                    page = page_number,
                    max_pages = self.max_pages,
                    "Malformed page ({}), stopping drain",
                    message
                );
                self.status = DrainStatus::Truncated {
                    page: page_number,
                    reason: message,
                };
                None
            }
            Err(e) => {
                tracing::warn!(
                    query = %self.query,
                    page = page_number,
                    error = %e,
                    "Page fetch failed, stopping drain"
                );
                self.status = DrainStatus::Failed {
                    page: page_number,
                    error: e.to_string(),
                };
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod fixture {
    //! Scripted in-memory notice source shared by crawler tests

    use super::*;
    use crate::crawler::envelope::Page;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted response for one (query, page) pair
    #[derive(Clone)]
    pub enum Scripted {
        Page {
            total: u64,
            ids: Vec<String>,
            last_page: Option<u32>,
        },
        Malformed {
            total: Option<u64>,
        },
        Unreachable,
    }

    /// Serves scripted pages and records every request
    #[derive(Default)]
    pub struct ScriptedSource {
        pages: HashMap<(String, u32), Scripted>,
        totals: Vec<(String, u64)>,
        pub requests: Mutex<Vec<(String, u32)>>,
    }

    impl ScriptedSource {
        pub fn new() -> Self {
            Self::default()
        }

        /// Scripts one page of a query
        pub fn page(
            mut self,
            query: &str,
            page: u32,
            total: u64,
            ids: &[&str],
            last_page: Option<u32>,
        ) -> Self {
            self.pages.insert(
                (query.to_string(), page),
                Scripted::Page {
                    total,
                    ids: ids.iter().map(|id| id.to_string()).collect(),
                    last_page,
                },
            );
            self
        }

        pub fn malformed(mut self, query: &str, page: u32) -> Self {
            self.pages
                .insert((query.to_string(), page), Scripted::Malformed { total: None });
            self
        }

        /// A page that reports `total` but has no records list
        pub fn malformed_with_total(mut self, query: &str, page: u32, total: u64) -> Self {
            self.pages.insert(
                (query.to_string(), page),
                Scripted::Malformed { total: Some(total) },
            );
            self
        }

        pub fn unreachable(mut self, query: &str, page: u32) -> Self {
            self.pages.insert((query.to_string(), page), Scripted::Unreachable);
            self
        }

        /// Reports `total` (and no records) for any query whose string starts with `prefix`
        pub fn total_for_prefix(mut self, prefix: &str, total: u64) -> Self {
            self.totals.push((prefix.to_string(), total));
            self
        }

        pub fn requested(&self) -> Vec<(String, u32)> {
            self.requests.lock().unwrap().clone()
        }

        pub fn requested_pages(&self, query: &str) -> Vec<u32> {
            self.requested()
                .into_iter()
                .filter(|(q, _)| q == query)
                .map(|(_, p)| p)
                .collect()
        }
    }

    #[async_trait]
    impl NoticeSource for ScriptedSource {
        async fn fetch_page(&self, query: &Query, page: u32) -> Result<Page, FetchError> {
            let key = query.to_string();
            self.requests.lock().unwrap().push((key.clone(), page));

            let scripted = self.pages.get(&(key.clone(), page)).cloned().or_else(|| {
                self.totals
                    .iter()
                    .filter(|(prefix, _)| key.starts_with(prefix.as_str()))
                    .max_by_key(|(prefix, _)| prefix.len())
                    .map(|(_, total)| Scripted::Page {
                        total: *total,
                        ids: Vec::new(),
                        last_page: None,
                    })
            });

            match scripted.unwrap_or(Scripted::Page {
                total: 0,
                ids: Vec::new(),
                last_page: None,
            }) {
                Scripted::Page {
                    total,
                    ids,
                    last_page,
                } => Ok(Page {
                    number: page,
                    total,
                    notices: ids
                        .into_iter()
                        .map(|id| Notice::new(serde_json::json!({ "entity_id": id })))
                        .collect(),
                    last_page,
                }),
                Scripted::Malformed { total } => Err(FetchError::UnexpectedShape {
                    url: key,
                    message: "missing '_embedded.notices'".to_string(),
                    total,
                }),
                Scripted::Unreachable => Err(FetchError::Transport {
                    url: key,
                    message: "Connection refused".to_string(),
                }),
            }
        }
    }
}
