//! Integration tests for HttpFetcher using wiremock
//!
//! These tests validate the HTTP fetcher's behavior with mock servers.

use std::time::{Duration, Instant};

use fleetcrawl::config::WorkerConfig;
use fleetcrawl::crawler::{HttpFetcher, PageFetcher};
use fleetcrawl::utils::error::FetchError;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Test that the configured user agent is sent
#[tokio::test]
async fn test_user_agent_header() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "fleetcrawl-agent/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<title>ua</title>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = WorkerConfig {
        user_agent: "fleetcrawl-agent/1.0".to_string(),
        requests_per_second: 0,
        ..WorkerConfig::default()
    };
    let fetcher = HttpFetcher::new(&config).unwrap();
    let page = fetcher.fetch(&format!("{}/", mock_server.uri())).await.unwrap();
    assert_eq!(page.status, 200);
}

/// Server errors are pages, not fetch errors, and are not retried
#[tokio::test]
async fn test_server_error_not_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/boom"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::with_config(Duration::from_secs(5), 0, "t").unwrap();
    let page = fetcher
        .fetch(&format!("{}/boom", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(page.status, 503);
    assert_eq!(page.body, "unavailable");
}

/// Non-HTML bodies are returned as text
#[tokio::test]
async fn test_non_html_body_is_text() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(r#"{"ok":true}"#),
        )
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::with_config(Duration::from_secs(5), 0, "t").unwrap();
    let page = fetcher
        .fetch(&format!("{}/data.json", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(page.body, r#"{"ok":true}"#);
}

/// Rate limiter spaces out requests
#[tokio::test]
async fn test_rate_limit_spacing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    // 2 req/s with a burst of two: the last two requests wait ~500ms each
    let fetcher = HttpFetcher::with_config(Duration::from_secs(5), 2, "t").unwrap();
    let url = format!("{}/", mock_server.uri());

    let start = Instant::now();
    for _ in 0..4 {
        fetcher.fetch(&url).await.unwrap();
    }
    assert!(start.elapsed() >= Duration::from_millis(900));
}

/// Malformed URLs never reach the network
#[tokio::test]
async fn test_invalid_url() {
    let fetcher = HttpFetcher::with_config(Duration::from_secs(1), 0, "t").unwrap();
    let err = fetcher.fetch("not a url").await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidUrl(_)), "got {err:?}");
    assert!(!err.is_recoverable());
}
