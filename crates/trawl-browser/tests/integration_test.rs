use std::time::Duration;
use trawl_browser::{BrowserEngine, SessionDriver};

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_browser_engine_creation() {
    let engine = BrowserEngine::new().await;
    assert!(engine.is_ok(), "Failed to create browser engine");
    engine.unwrap().close().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_navigation_and_body() {
    let engine = BrowserEngine::new().await.unwrap();

    let result = engine.navigate("https://example.com").await;
    assert!(result.is_ok(), "Navigation failed");

    let body = engine.current_body().await.unwrap();
    assert!(body.contains("Example Domain"));
    assert!(engine
        .wait_for_selector("h1", Duration::from_secs(3))
        .await
        .unwrap());

    engine.close().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_capture_matches_document_response() {
    let engine = BrowserEngine::new().await.unwrap();

    engine.intercept_begin("example.com").await.unwrap();
    engine.navigate("https://example.com").await.unwrap();

    let packets = engine.intercept_await(Duration::from_secs(10)).await.unwrap();
    assert!(!packets.is_empty(), "expected the document response");
    assert!(packets[0].url().contains("example.com"));

    engine.intercept_stop().await.unwrap();
    assert!(engine
        .intercept_await(Duration::from_millis(100))
        .await
        .unwrap()
        .is_empty());

    engine.close().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_close_is_idempotent() {
    let engine = BrowserEngine::new().await.unwrap();
    engine.close().await.unwrap();
    engine.close().await.unwrap();
    assert!(engine.navigate("https://example.com").await.is_err());
}
