//! Fake search API served through wiremock

use notice_sweep::crawler::{FetcherSettings, HttpFetcher, RetryPolicy};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const SEARCH_PATH: &str = "/notices/v1/red";

/// One scripted page: reported total, record ids, last advertised page
#[derive(Clone)]
pub struct FakePage {
    pub total: u64,
    pub ids: Vec<String>,
    pub last_page: u32,
}

/// Routes on the filter parameters of the request, ignoring `page`
///
/// Unscripted queries answer with an empty result.
#[derive(Clone, Default)]
pub struct FakeApi {
    pages: HashMap<(String, u32), FakePage>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// `filters` is the query string without `page`, e.g. `sexId=F`; empty for the root
    pub fn page(
        mut self,
        filters: &str,
        page: u32,
        total: u64,
        ids: &[&str],
        last_page: u32,
    ) -> Self {
        self.pages.insert(
            (filters.to_string(), page),
            FakePage {
                total,
                ids: ids.iter().map(|id| id.to_string()).collect(),
                last_page,
            },
        );
        self
    }

    pub async fn mount(self, server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .respond_with(self)
            .mount(server)
            .await;
    }
}

impl Respond for FakeApi {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut page = 1;
        let mut filters = Vec::new();
        for (key, value) in request.url.query_pairs() {
            if key == "page" {
                page = value.parse().unwrap_or(1);
            } else {
                filters.push(format!("{}={}", key, value));
            }
        }

        let scripted = self
            .pages
            .get(&(filters.join("&"), page))
            .cloned()
            .unwrap_or(FakePage {
                total: 0,
                ids: Vec::new(),
                last_page: 1,
            });

        ResponseTemplate::new(200).set_body_json(envelope(&scripted))
    }
}

/// A notice as the API returns it; the forename is always null
pub fn notice(id: &str) -> Value {
    json!({
        "entity_id": id,
        "name": "DOE",
        "forename": null,
        "date_of_birth": "1970/01/01",
        "nationalities": ["FR"],
        "_links": {"images": {"href": format!("/notices/v1/red/{}/images", id)}}
    })
}

fn envelope(page: &FakePage) -> Value {
    let notices: Vec<Value> = page.ids.iter().map(|id| notice(id)).collect();
    json!({
        "total": page.total,
        "_embedded": {"notices": notices},
        "_links": {
            "self": {"href": format!("{}?page=1", SEARCH_PATH)},
            "last": {"href": format!("{}?page={}", SEARCH_PATH, page.last_page)}
        }
    })
}

/// Fetcher pointed at the mock server with test-sized delays
pub fn fetcher(server: &MockServer) -> HttpFetcher {
    let base_url = url::Url::parse(&format!("{}{}", server.uri(), SEARCH_PATH)).unwrap();
    let policy = RetryPolicy::new(2, Duration::from_millis(10));
    HttpFetcher::new(
        reqwest::Client::new(),
        base_url,
        FetcherSettings {
            request_delay: Duration::from_millis(1),
            rate_limit_cooldown: Duration::from_millis(10),
            probe_policy: policy.clone(),
            leaf_policy: policy,
        },
    )
}
