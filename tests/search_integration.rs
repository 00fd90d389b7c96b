//! Integration tests for search aggregation against a mock search API.

mod support;

use std::sync::Arc;

use imgsearch_core::search::{
    Aggregator, GoogleImageClient, ResultCache, SearchCredentials, SearchError,
};
use serde_json::{Value, json};
use support::socket_guard::start_mock_server_or_skip;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Serves `available` fake results, honoring `start` and `num`.
struct PagedResponder {
    available: u32,
}

impl Respond for PagedResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let param = |name: &str| -> u32 {
            request
                .url
                .query_pairs()
                .find(|(key, _)| key == name)
                .and_then(|(_, value)| value.parse().ok())
                .unwrap_or(0)
        };
        let start = param("start");
        let num = param("num");
        let last = (start + num).saturating_sub(1).min(self.available);

        let items: Vec<Value> = (start..=last)
            .map(|n| {
                json!({
                    "link": format!("https://img.test/{n}.jpg"),
                    "title": format!("Result {n}"),
                    "displayLink": "img.test",
                    "mime": "image/jpeg",
                    "fileFormat": "image/jpeg",
                    "image": { "width": 640, "height": 480 },
                    "kind": "customsearch#result"
                })
            })
            .collect();

        if items.is_empty() {
            ResponseTemplate::new(200).set_body_json(json!({ "kind": "customsearch#search" }))
        } else {
            ResponseTemplate::new(200).set_body_json(json!({ "items": items }))
        }
    }
}

fn aggregator(mock_server: &MockServer) -> Aggregator {
    let client = GoogleImageClient::with_endpoint(
        reqwest::Client::new(),
        format!("{}/customsearch/v1", mock_server.uri()),
    );
    Aggregator::new(Arc::new(client), Arc::new(ResultCache::new()))
}

fn credentials() -> SearchCredentials {
    SearchCredentials::new("test-key", "test-cx")
}

#[tokio::test]
async fn test_search_aggregates_three_pages() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("key", "test-key"))
        .and(query_param("cx", "test-cx"))
        .and(query_param("q", "red panda"))
        .and(query_param("searchType", "image"))
        .respond_with(PagedResponder { available: 100 })
        .expect(3)
        .mount(&mock_server)
        .await;

    let aggregator = aggregator(&mock_server);
    let results = aggregator
        .get_results("red panda", &credentials(), 25)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 25);
    for (index, item) in results.iter().enumerate() {
        let id = index as u64 + 1;
        assert_eq!(item.id, id);
        assert_eq!(item.link, format!("https://img.test/{id}.jpg"));
    }
    assert_eq!(results[0].display_link, "img.test");
    assert_eq!(results[0].image["width"], 640);

    let received = mock_server.received_requests().await.unwrap_or_default();
    let pages: Vec<(String, String)> = received
        .iter()
        .map(|request| {
            let pairs: Vec<(String, String)> = request.url.query_pairs().into_owned().collect();
            let get = |name: &str| {
                pairs
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.clone())
                    .unwrap_or_default()
            };
            (get("start"), get("num"))
        })
        .collect();
    assert_eq!(
        pages,
        [
            ("1".to_string(), "10".to_string()),
            ("11".to_string(), "10".to_string()),
            ("21".to_string(), "5".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_search_serves_repeat_requests_from_cache() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .respond_with(PagedResponder { available: 100 })
        .expect(1)
        .mount(&mock_server)
        .await;

    let aggregator = aggregator(&mock_server);
    let first = aggregator
        .get_results("owls", &credentials(), 5)
        .await
        .expect("first search should succeed");
    let second = aggregator
        .get_results("owls", &credentials(), 5)
        .await
        .expect("second search should succeed");
    let smaller = aggregator
        .get_results("owls", &credentials(), 3)
        .await
        .expect("smaller search should succeed");

    assert_eq!(first, second);
    assert_eq!(smaller, first[..3]);
}

#[tokio::test]
async fn test_search_stops_when_upstream_exhausted() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .respond_with(PagedResponder { available: 30 })
        .expect(4)
        .mount(&mock_server)
        .await;

    let aggregator = aggregator(&mock_server);
    let results = aggregator
        .get_results("rare bird", &credentials(), 50)
        .await
        .expect("exhaustion is not an error");

    assert_eq!(results.len(), 30);
    assert_eq!(results.last().map(|item| item.id), Some(30));
}

#[tokio::test]
async fn test_search_surfaces_structured_upstream_error() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("start", "1"))
        .respond_with(PagedResponder { available: 100 })
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("start", "11"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" }
        })))
        .mount(&mock_server)
        .await;

    let aggregator = aggregator(&mock_server);
    let error = aggregator
        .get_results("cats", &credentials(), 20)
        .await
        .expect_err("second page should fail");

    match &error {
        SearchError::Upstream { status, .. } => assert_eq!(*status, 429),
        other => panic!("Expected Upstream error, got: {other:?}"),
    }
    let detail = error.upstream_detail().expect("JSON detail captured");
    assert_eq!(detail["error"]["message"], "Quota exceeded");

    // The first page stays cached for the next attempt.
    assert_eq!(aggregator.cache().cached_len("cats").await, 10);
}
