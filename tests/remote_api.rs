//! HTTP contract tests for the quote API client against a mock server.

use quotefeed::feed::{EngageError, EngagementRemote, FeedSource, FetchError, PageQuery};
use quotefeed::model::{EngageKind, FeedFilter};
use quotefeed::remote::QuoteApi;
use serde_json::json;
use std::collections::BTreeSet;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer, timeout: Duration) -> QuoteApi {
    QuoteApi::new(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        timeout,
    )
}

fn page(page: u32, filter: FeedFilter) -> PageQuery {
    PageQuery {
        page,
        filter,
        language: "EN".to_string(),
    }
}

#[tokio::test]
async fn test_fetch_page_parses_records_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/zen/images"))
        .and(query_param("page", "2"))
        .and(query_param("l", "EN"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 9, "message": "Act.", "author": "Anon", "image64encoded": "aGk=", "likes": 4, "dislikes": 2},
            {"id": 3, "message": "Rest."}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let quotes = api_for(&server, Duration::from_secs(5))
        .fetch_page(page(2, FeedFilter::All))
        .await
        .unwrap();

    assert_eq!(quotes.len(), 2);
    assert_eq!(quotes[0].id, 9);
    assert_eq!(quotes[0].like_count, 4);
    assert_eq!(quotes[0].dislike_count, 2);
    assert_eq!(quotes[0].content.image.as_deref(), Some("aGk="));
    assert_eq!(quotes[1].id, 3);
    assert_eq!(quotes[1].like_count, 0);
    assert!(quotes[1].content.author.is_none());
}

#[tokio::test]
async fn test_fetch_page_sends_id_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/zen/images"))
        .and(query_param("ids", "5,7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let quotes = api_for(&server, Duration::from_secs(5))
        .fetch_page(page(1, FeedFilter::Ids(BTreeSet::from([7, 5]))))
        .await
        .unwrap();

    assert!(quotes.is_empty());
}

#[tokio::test]
async fn test_fetch_page_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = api_for(&server, Duration::from_secs(5))
        .fetch_page(page(1, FeedFilter::All))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::HttpStatus(500)));
}

#[tokio::test]
async fn test_fetch_page_invalid_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = api_for(&server, Duration::from_secs(5))
        .fetch_page(page(1, FeedFilter::All))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Parse(_)));
}

#[tokio::test]
async fn test_fetch_page_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = api_for(&server, Duration::from_millis(100))
        .fetch_page(page(1, FeedFilter::All))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Timeout));
}

#[tokio::test]
async fn test_engage_puts_to_kind_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/zen/42/dislike"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    api_for(&server, Duration::from_secs(5))
        .engage(42, EngageKind::Dislike)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_engage_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/zen/42/like"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = api_for(&server, Duration::from_secs(5))
        .engage(42, EngageKind::Like)
        .await
        .unwrap_err();

    assert!(matches!(err, EngageError::HttpStatus(404)));
}
