use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use reel_relay::relay::lookup::{LookupClient, LookupConfig, LookupError, PostLookup};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

const API_KEY: &str = "test-key";
const LINK: &str = "https://www.instagram.com/reel/ABC123/?igshid=1";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Url(String),
    Shortcode(String),
}

type Calls = Arc<Mutex<Vec<Call>>>;

/// Fake post detail API answering the `url=` and `shortcode=` modes with fixed replies.
async fn start_lookup_server(
    by_url: (StatusCode, &'static str),
    by_shortcode: (StatusCode, &'static str),
) -> (String, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let log = calls.clone();

    let app = Router::new().route(
        "/post",
        get(
            move |Query(params): Query<HashMap<String, String>>, headers: HeaderMap| {
                let log = log.clone();
                async move {
                    let key = headers
                        .get("x-api-key")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default();
                    if key != API_KEY {
                        return (StatusCode::UNAUTHORIZED, String::new());
                    }

                    let mut log = log.lock().expect("calls lock");
                    if let Some(url) = params.get("url") {
                        log.push(Call::Url(url.clone()));
                        (by_url.0, by_url.1.to_string())
                    } else if let Some(code) = params.get("shortcode") {
                        log.push(Call::Shortcode(code.clone()));
                        (by_shortcode.0, by_shortcode.1.to_string())
                    } else {
                        (StatusCode::BAD_REQUEST, String::new())
                    }
                }
            },
        ),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server");
    });

    (format!("http://{addr}/post"), calls)
}

fn client(endpoint: &str, api_key: Option<&str>) -> LookupClient {
    let config = LookupConfig::new(endpoint)
        .with_api_key(api_key.map(ToString::to_string))
        .with_timeouts(Duration::from_secs(2), Duration::from_secs(5));
    LookupClient::new(config)
}

fn recorded(calls: &Calls) -> Vec<Call> {
    calls.lock().expect("calls lock").clone()
}

#[tokio::test]
async fn test_url_lookup_success_skips_fallback() {
    let (endpoint, calls) = start_lookup_server(
        (StatusCode::OK, r#"{"video_url": "https://cdn/a.mp4"}"#),
        (StatusCode::OK, r#"{"unused": true}"#),
    )
    .await;

    let details = client(&endpoint, Some(API_KEY))
        .fetch_post(LINK)
        .await
        .expect("lookup should succeed");

    assert_eq!(details, json!({"video_url": "https://cdn/a.mp4"}));
    assert_eq!(recorded(&calls), vec![Call::Url(LINK.to_string())]);
}

#[tokio::test]
async fn test_url_lookup_error_falls_back_to_shortcode() {
    let (endpoint, calls) = start_lookup_server(
        (StatusCode::INTERNAL_SERVER_ERROR, "boom"),
        (StatusCode::OK, r#"{"video_url": "https://cdn/b.mp4"}"#),
    )
    .await;

    let details = client(&endpoint, Some(API_KEY))
        .fetch_post(LINK)
        .await
        .expect("fallback should succeed");

    assert_eq!(details, json!({"video_url": "https://cdn/b.mp4"}));
    assert_eq!(
        recorded(&calls),
        vec![
            Call::Url(LINK.to_string()),
            Call::Shortcode("ABC123".to_string())
        ]
    );
}

#[tokio::test]
async fn test_undecodable_url_response_falls_back_to_shortcode() {
    let (endpoint, calls) = start_lookup_server(
        (StatusCode::OK, "<html>rate limited</html>"),
        (StatusCode::OK, r#"{"ok": 1}"#),
    )
    .await;

    let details = client(&endpoint, Some(API_KEY))
        .fetch_post(LINK)
        .await
        .expect("fallback should succeed");

    assert_eq!(details, json!({"ok": 1}));
    assert_eq!(recorded(&calls).len(), 2);
}

#[tokio::test]
async fn test_shortcode_http_error_is_reported_with_status() {
    let (endpoint, _calls) =
        start_lookup_server((StatusCode::NOT_FOUND, ""), (StatusCode::NOT_FOUND, "")).await;

    let result = client(&endpoint, Some(API_KEY)).fetch_post(LINK).await;

    match result {
        Err(LookupError::Upstream { status }) => assert_eq!(status, StatusCode::NOT_FOUND),
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_shortcode_invalid_json_is_decode_error() {
    let (endpoint, _calls) = start_lookup_server(
        (StatusCode::BAD_GATEWAY, ""),
        (StatusCode::OK, "definitely not json"),
    )
    .await;

    let result = client(&endpoint, Some(API_KEY)).fetch_post(LINK).await;
    assert!(matches!(result, Err(LookupError::Decode(_))));
}

#[tokio::test]
async fn test_link_without_shortcode_is_unresolvable() {
    let (endpoint, calls) = start_lookup_server(
        (StatusCode::INTERNAL_SERVER_ERROR, ""),
        (StatusCode::OK, "{}"),
    )
    .await;

    let link = "https://www.instagram.com/stories/someone/123/";
    let result = client(&endpoint, Some(API_KEY)).fetch_post(link).await;

    assert!(matches!(result, Err(LookupError::InsufficientIdentifiers)));
    assert_eq!(recorded(&calls), vec![Call::Url(link.to_string())]);
}

#[tokio::test]
async fn test_missing_api_key_makes_no_request() {
    let (endpoint, calls) =
        start_lookup_server((StatusCode::OK, "{}"), (StatusCode::OK, "{}")).await;

    let result = client(&endpoint, None).fetch_post(LINK).await;

    assert!(matches!(result, Err(LookupError::MissingApiKey)));
    assert!(recorded(&calls).is_empty());
}

#[tokio::test]
async fn test_api_key_header_is_sent() {
    let (endpoint, calls) =
        start_lookup_server((StatusCode::OK, "{}"), (StatusCode::OK, "{}")).await;

    // The fake API answers 401 to both attempts when the key is wrong
    let result = client(&endpoint, Some("wrong-key")).fetch_post(LINK).await;

    match result {
        Err(LookupError::Upstream { status }) => assert_eq!(status, StatusCode::UNAUTHORIZED),
        other => panic!("expected unauthorized, got {other:?}"),
    }
    assert!(recorded(&calls).is_empty());
}
