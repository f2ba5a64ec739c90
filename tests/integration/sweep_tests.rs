//! Integration tests for the sweep
//!
//! These tests run the real HTTP fetcher against a wiremock search API and
//! deliver into the in-memory broker.

use crate::support::{fetcher, FakeApi, SEARCH_PATH};
use notice_sweep::catalog::load_catalog;
use notice_sweep::config::load_config;
use notice_sweep::crawler::{Coordinator, HttpFetcher, PlannerSettings};
use notice_sweep::publish::{CleanRecord, MemoryBroker, ReconnectPolicy, ReliablePublisher};
use notice_sweep::{FilterCatalog, FilterDimension};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sweep(
    source: HttpFetcher,
    broker: &MemoryBroker,
    order: Vec<FilterDimension>,
) -> Coordinator<HttpFetcher, MemoryBroker> {
    Coordinator::new(
        source,
        FilterCatalog::from_codes(["FR", "DE"]),
        PlannerSettings {
            threshold: 160,
            page_ceiling: 20,
            order,
        },
        ReliablePublisher::new(broker.clone(), ReconnectPolicy::new(3, Duration::from_millis(10))),
        CancellationToken::new(),
    )
}

#[tokio::test]
async fn test_full_sweep_refines_and_publishes_each_record_once() {
    let server = MockServer::start().await;
    FakeApi::new()
        // Oversized root: split on sex
        .page("", 1, 420, &["r1"], 21)
        .page("sexId=U", 1, 3, &["u1", "u2"], 2)
        .page("sexId=U", 2, 3, &["u3"], 2)
        // Still oversized: split on nationality
        .page("sexId=F", 1, 250, &["f1"], 13)
        .page("sexId=F&nationality=FR", 1, 2, &["f1", "f2"], 1)
        .page("sexId=F&nationality=DE", 1, 2, &["f3", "u1"], 1)
        .page("sexId=M", 1, 1, &["m1"], 1)
        .mount(&server)
        .await;

    let broker = MemoryBroker::new("notices.red");
    let order = vec![FilterDimension::Sex, FilterDimension::Nationality];

    let summary = sweep(fetcher(&server), &broker, order).run().await;

    let mut delivered = broker.delivered_identities();
    delivered.sort();
    assert_eq!(delivered, vec!["f1", "f2", "f3", "m1", "u1", "u2", "u3"]);

    assert_eq!(summary.queries_visited, 4);
    assert_eq!(summary.splits, 2);
    assert_eq!(summary.records_seen, 8);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.delivered, 7);
    assert!(summary.is_complete());
}

#[tokio::test]
async fn test_published_records_are_cleaned() {
    let server = MockServer::start().await;
    FakeApi::new().page("", 1, 1, &["2019/77"], 1).mount(&server).await;

    let broker = MemoryBroker::new("notices.red");
    sweep(fetcher(&server), &broker, vec![FilterDimension::Sex])
        .run()
        .await;

    let delivered = broker.delivered();
    assert_eq!(delivered.len(), 1);

    let record: CleanRecord = serde_json::from_slice(&delivered[0].payload).unwrap();
    assert_eq!(record.entity_id, "2019/77");
    assert_eq!(record.forename, "unknown");
    assert_eq!(record.nationalities, vec!["FR"]);
    assert_eq!(
        record.image,
        serde_json::json!({"href": format!("{}/2019/77/images", SEARCH_PATH)})
    );
}

#[tokio::test]
async fn test_server_errors_leave_query_unresolved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let broker = MemoryBroker::new("notices.red");
    let summary = sweep(fetcher(&server), &broker, vec![FilterDimension::Sex])
        .run()
        .await;

    assert_eq!(summary.unresolved.len(), 1);
    assert_eq!(summary.unresolved[0].query.to_string(), "<unfiltered>");
    assert!(summary.unresolved[0].reason.to_string().contains("HTTP 503"));
    assert!(broker.delivered().is_empty());

    // One logical request per attempt
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_records_found_during_outage_are_delivered_in_order() {
    let server = MockServer::start().await;
    FakeApi::new()
        .page("", 1, 5, &["a", "b", "c"], 2)
        .page("", 2, 5, &["d", "e"], 2)
        .mount(&server)
        .await;

    let broker = MemoryBroker::new("notices.red");
    broker.set_available(false);

    let restore = broker.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        restore.set_available(true);
    });

    let summary = sweep(fetcher(&server), &broker, vec![FilterDimension::Sex])
        .run()
        .await;

    assert_eq!(summary.buffered, 0);
    assert_eq!(broker.delivered_identities(), vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn test_sweep_from_config_file_with_scraped_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<form><select name="nationality">
                 <option value="">All</option>
                 <option value="FR">France</option>
                 <option value="DE">Germany</option>
               </select></form>"#,
        ))
        .mount(&server)
        .await;
    FakeApi::new().page("", 1, 2, &["x1", "x2"], 1).mount(&server).await;

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[api]
base-url = "{uri}{search}"
request-delay-ms = 100

[user-agent]
crawler-name = "TestSweep"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[publisher]
server-url = "nats://localhost:4222"
subject = "notices.red"
stream = "NOTICES"

[catalog]
page-url = "{uri}/search"
"#,
        uri = server.uri(),
        search = SEARCH_PATH
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    let client = reqwest::Client::new();
    let catalog = load_catalog(&config.catalog, &client).await.unwrap();
    assert_eq!(catalog.codes(), ["FR", "DE"]);

    let broker = MemoryBroker::new(config.publisher.subject.clone());
    let coordinator = Coordinator::new(
        HttpFetcher::from_config(client, &config).unwrap(),
        catalog,
        PlannerSettings::from_config(&config),
        ReliablePublisher::new(broker.clone(), ReconnectPolicy::new(1, Duration::from_millis(1))),
        CancellationToken::new(),
    );

    let summary = coordinator.run().await;

    assert_eq!(broker.delivered_identities(), vec!["x1", "x2"]);
    assert_eq!(summary.queries_visited, 1);
    assert_eq!(summary.pages_fetched, 1);
}
