//! HTTP fetcher against mock servers

use course_harvest::config::ApiConfig;
use course_harvest::fetch::{
    ApiFetcher, ContentFetcher, FetchError, FetchMode, FetchedContent, BROWSER_USER_AGENT,
};
use course_harvest::input::Credential;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, header, headers, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "fc-integration-token-0123456789";

fn fetcher(server: &MockServer) -> ApiFetcher {
    ApiFetcher::new(&ApiConfig {
        base_url: server.uri(),
        request_timeout_secs: 5,
        user_agent: "TestHarvester/1.0".to_string(),
    })
    .expect("Failed to build fetcher")
}

fn target(server: &MockServer, file: &str) -> Url {
    Url::parse(&format!("{}/lessons/MOD-1/{}", server.uri(), file)).unwrap()
}

#[tokio::test]
async fn test_converted_fetch_sends_credential_and_parses_renders() {
    let server = MockServer::start().await;
    let manifest_url = target(&server, "imsmanifest.xml");

    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .and(body_partial_json(json!({
            "url": manifest_url.as_str(),
            "formats": ["markdown", "html"],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "markdown": "dr/img1.json",
                "html": "<p>dr/img1.json</p>",
                "metadata": { "statusCode": 200 }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let content = fetcher(&server)
        .fetch(&manifest_url, &Credential::new(TOKEN), FetchMode::Converted)
        .await
        .unwrap();

    let FetchedContent::Converted(document) = content else {
        panic!("expected a converted document");
    };
    assert_eq!(document.markdown.as_deref(), Some("dr/img1.json"));
    assert_eq!(document.html.as_deref(), Some("<p>dr/img1.json</p>"));
    assert_eq!(document.metadata, Some(json!({ "statusCode": 200 })));
}

#[tokio::test]
async fn test_too_many_requests_is_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .mount(&server)
        .await;

    let error = fetcher(&server)
        .fetch(
            &target(&server, "imsmanifest.xml"),
            &Credential::new(TOKEN),
            FetchMode::Converted,
        )
        .await
        .unwrap_err();

    assert!(error.is_rate_limited());
    assert!(matches!(
        error,
        FetchError::RateLimited {
            retry_after_secs: Some(30),
            ..
        }
    ));
}

#[tokio::test]
async fn test_api_reported_failure_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "Unsupported content type"
        })))
        .mount(&server)
        .await;

    let error = fetcher(&server)
        .fetch(
            &target(&server, "dr/img1.json"),
            &Credential::new(TOKEN),
            FetchMode::Converted,
        )
        .await
        .unwrap_err();

    match error {
        FetchError::Rejected { message, .. } => assert_eq!(message, "Unsupported content type"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_keeps_status_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let error = fetcher(&server)
        .fetch(
            &target(&server, "imsmanifest.xml"),
            &Credential::new(TOKEN),
            FetchMode::Converted,
        )
        .await
        .unwrap_err();

    assert!(matches!(error, FetchError::Status { status_code: 502, .. }));
}

#[tokio::test]
async fn test_raw_fetch_downloads_bytes_directly() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lessons/MOD-1/assets/js/player.js"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"var a=1;".to_vec()))
        .mount(&server)
        .await;
    // The scrape endpoint must not be involved
    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let content = fetcher(&server)
        .fetch(
            &target(&server, "assets/js/player.js"),
            &Credential::new(TOKEN),
            FetchMode::Raw,
        )
        .await
        .unwrap();

    assert_eq!(content, FetchedContent::Raw(b"var a=1;".to_vec()));
}

#[tokio::test]
async fn test_raw_fetch_missing_file() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let error = fetcher(&server)
        .fetch(
            &target(&server, "dr/img9.json"),
            &Credential::new(TOKEN),
            FetchMode::Raw,
        )
        .await
        .unwrap_err();

    assert!(matches!(error, FetchError::Status { status_code: 404, .. }));
}

#[tokio::test]
async fn test_raw_fetch_sends_browser_headers() {
    let server = MockServer::start().await;
    // The mock server splits header values on commas
    let user_agent_parts: Vec<&str> = BROWSER_USER_AGENT.split(',').map(str::trim).collect();

    Mock::given(method("GET"))
        .and(path("/lessons/MOD-1/dr/img1.json"))
        .and(headers("user-agent", user_agent_parts))
        .and(header("accept", "*/*"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let content = fetcher(&server)
        .fetch(
            &target(&server, "dr/img1.json"),
            &Credential::new(TOKEN),
            FetchMode::Raw,
        )
        .await
        .unwrap();

    assert_eq!(content, FetchedContent::Raw(b"{}".to_vec()));
}
