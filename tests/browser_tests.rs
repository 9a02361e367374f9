//! Browser module tests
//!
//! Config, validation and capture-log behavior run everywhere; the
//! end-to-end flows need a Chrome/Chromium binary and are `#[ignore]`d.

use std::collections::HashMap;

use sitelens::browser::{
    validate_url, BrowserConfig, BrowserSession, NetworkLog, RequestFilter, RequestRecord,
    ResponseRecord, NAVIGATION_TIMEOUT_MS,
};

fn record(url: &str, resource_type: &str) -> RequestRecord {
    RequestRecord {
        url: url.to_string(),
        method: "GET".to_string(),
        headers: HashMap::new(),
        resource_type: resource_type.to_string(),
        timestamp: "2024-01-01T00:00:00Z".to_string(),
        body: None,
        response: None,
    }
}

#[test]
fn test_browser_config_default() {
    let config = BrowserConfig::default();
    assert!(config.headless);
    assert_eq!(config.width, 1920);
    assert_eq!(config.height, 1080);
    assert!(config.sandbox);
    assert_eq!(config.timeout_ms, NAVIGATION_TIMEOUT_MS);
    assert!(config.chrome_path.is_none());
}

#[test]
fn test_browser_config_builder() {
    let config = BrowserConfig::builder()
        .headless(false)
        .viewport(1280, 720)
        .sandbox(false)
        .timeout_ms(10_000)
        .arg("--disable-gpu")
        .arg("--no-first-run")
        .build();

    assert!(!config.headless);
    assert_eq!(config.width, 1280);
    assert_eq!(config.height, 720);
    assert!(!config.sandbox);
    assert_eq!(config.timeout_ms, 10_000);
    assert_eq!(config.extra_args.len(), 2);
}

#[test]
fn test_url_validation() {
    assert!(validate_url("https://example.com").is_ok());
    assert!(validate_url("http://localhost:8080/api").is_ok());
    assert!(validate_url("").is_err());
    assert!(validate_url("not a url").is_err());
    assert!(validate_url("file:///etc/hosts").is_err());
    assert!(validate_url("ws://example.com").is_err());
}

#[test]
fn test_network_log_capture_order() {
    let log = NetworkLog::new();
    log.push(record("https://example.com/", "document"));
    log.push(record("https://example.com/app.js", "script"));
    log.push(record("https://example.com/api/items", "xhr"));

    let all = log.snapshot();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].resource_type, "document");
    assert_eq!(all[2].url, "https://example.com/api/items");
}

#[test]
fn test_network_log_filtering() {
    let log = NetworkLog::new();
    log.push(record("https://example.com/", "document"));
    log.push(record("https://example.com/api", "xhr"));
    log.push(record("https://example.com/graphql", "fetch"));
    log.push(record("https://example.com/logo.png", "image"));

    assert_eq!(log.filtered(RequestFilter::All).len(), 4);
    assert_eq!(log.filtered(RequestFilter::Xhr).len(), 1);
    assert_eq!(log.filtered(RequestFilter::Fetch).len(), 1);
}

#[test]
fn test_response_correlation_is_oldest_unmatched() {
    let log = NetworkLog::new();
    log.push(record("https://example.com/poll", "xhr"));
    log.push(record("https://example.com/poll", "xhr"));
    log.push(record("https://example.com/poll", "xhr"));

    let response = |status| ResponseRecord {
        status,
        headers: HashMap::new(),
        content_type: "application/json".to_string(),
        content: Some("{}".to_string()),
        error: None,
    };

    assert!(log.attach_response("https://example.com/poll", response(200)));
    assert!(log.attach_response("https://example.com/poll", response(201)));
    assert!(log.attach_response("https://example.com/poll", response(202)));
    assert!(!log.attach_response("https://example.com/poll", response(203)));

    let statuses: Vec<_> = log
        .snapshot()
        .iter()
        .map(|r| r.response.as_ref().unwrap().status)
        .collect();
    assert_eq!(statuses, vec![200, 201, 202]);
}

// ============================================================================
// End-to-end flows (require a Chrome/Chromium install)
// ============================================================================

#[tokio::test]
#[ignore = "requires a Chrome/Chromium binary"]
async fn test_navigate_captures_title_and_requests() {
    let mut session = BrowserSession::launch(BrowserConfig::default())
        .await
        .unwrap();

    let outcome = session.navigate("https://example.com", 1.0).await.unwrap();
    assert!(outcome.url.starts_with("https://example.com"));
    assert!(!outcome.title.is_empty());
    assert!(!session.network_log().is_empty());

    session.close().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a Chrome/Chromium binary"]
async fn test_page_html_roundtrip() {
    let mut session = BrowserSession::launch(BrowserConfig::default())
        .await
        .unwrap();

    session.navigate("https://example.com", 1.0).await.unwrap();
    let (url, html) = session.page_html().await.unwrap();

    assert!(url.starts_with("https://example.com"));
    assert!(html.contains("<html"));
    assert!(html.contains("Example Domain"));

    session.close().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a Chrome/Chromium binary"]
async fn test_navigation_clears_previous_capture() {
    let mut session = BrowserSession::launch(BrowserConfig::default())
        .await
        .unwrap();

    session.navigate("https://example.com", 1.0).await.unwrap();
    let first_count = session.network_log().len();
    assert!(first_count > 0);

    session
        .navigate("https://www.iana.org/domains/reserved", 1.0)
        .await
        .unwrap();
    let urls: Vec<_> = session
        .network_log()
        .snapshot()
        .iter()
        .map(|r| r.url.clone())
        .collect();
    assert!(urls.iter().all(|u| !u.starts_with("https://example.com")));

    session.close().await.unwrap();
}
