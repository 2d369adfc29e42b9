//! Response classification against a live mock server

use sumi_harvest::config::FetcherConfig;
use sumi_harvest::crawler::{DocumentSource, Fetcher, StaticSource};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> Fetcher {
    Fetcher::new(&FetcherConfig {
        request_timeout_ms: 2_000,
        hard_timeout_ms: 3_000,
        user_agent: Some("HarvestTest/1.0".to_string()),
    })
    .expect("Failed to build fetcher")
}

async fn mount(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_html_ok_carries_body() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        "/page",
        ResponseTemplate::new(200)
            .set_body_raw("<html><h1>Hello</h1></html>", "text/html; charset=utf-8"),
    )
    .await;

    let uri = format!("{}/page", mock_server.uri());
    let response = fetcher().fetch(&uri).await.expect("Exchange should complete");

    assert_eq!(response.status_code, 200);
    assert!(response.is_html);
    assert_eq!(response.request_uri, uri);
    assert!(response.body.unwrap().contains("Hello"));
}

#[tokio::test]
async fn test_not_found_has_no_body() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        "/missing",
        ResponseTemplate::new(404)
            .set_body_raw("<html>gone</html>", "text/html"),
    )
    .await;

    let response = fetcher()
        .fetch(&format!("{}/missing", mock_server.uri()))
        .await
        .expect("Exchange should complete");

    assert_eq!(response.status_code, 404);
    assert!(response.is_html);
    assert_eq!(response.body, None);
}

#[tokio::test]
async fn test_json_ok_has_no_body() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        "/api",
        ResponseTemplate::new(200)
            .set_body_raw(r#"{"ok":true}"#, "application/json"),
    )
    .await;

    let response = fetcher()
        .fetch(&format!("{}/api", mock_server.uri()))
        .await
        .expect("Exchange should complete");

    assert_eq!(response.status_code, 200);
    assert!(!response.is_html);
    assert_eq!(response.body, None);
}

#[tokio::test]
async fn test_redirects_are_followed() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        "/old",
        ResponseTemplate::new(301).insert_header("location", "/new"),
    )
    .await;
    mount(
        &mock_server,
        "/new",
        ResponseTemplate::new(200)
            .set_body_raw("<p>moved</p>", "text/html"),
    )
    .await;

    let uri = format!("{}/old", mock_server.uri());
    let response = fetcher().fetch(&uri).await.expect("Exchange should complete");

    assert_eq!(response.status_code, 200);
    assert_eq!(response.request_uri, uri);
    assert!(response.body.is_some());
}

#[tokio::test]
async fn test_user_agent_is_sent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", "HarvestTest/1.0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<p>hi</p>", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let source = StaticSource::new(fetcher());
    assert!(source.load(&mock_server.uri()).await.is_some());
}

#[tokio::test]
async fn test_hard_timeout_yields_none() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        "/slow",
        ResponseTemplate::new(200)
            .set_body_raw("<p>late</p>", "text/html")
            .set_delay(std::time::Duration::from_secs(2)),
    )
    .await;

    let impatient = Fetcher::new(&FetcherConfig {
        request_timeout_ms: 5_000,
        hard_timeout_ms: 200,
        user_agent: None,
    })
    .expect("Failed to build fetcher");

    assert_eq!(
        impatient.fetch(&format!("{}/slow", mock_server.uri())).await,
        None
    );
}
