mod common;

use common::FakeDriver;
use std::time::Duration;
use trawl_collector::NetworkCapture;
use trawl_core::{Payload, ResponsePacket};

fn packet(sequence: u64) -> ResponsePacket {
    ResponsePacket::new(
        sequence,
        "https://www.zhipin.com/wapi/zpgeek/search/joblist.json",
        Payload::Text("{}".to_string()),
    )
}

#[tokio::test(start_paused = true)]
async fn test_disarmed_capture_returns_nothing() {
    let driver = FakeDriver::new();
    driver.push_packets(vec![packet(1)]);
    let mut capture = NetworkCapture::new(driver.clone());

    let packets = capture.await_packets(Duration::from_secs(5)).await.unwrap();
    assert!(packets.is_empty());
    assert_eq!(driver.awaits(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_packets_come_back_in_arrival_order() {
    let driver = FakeDriver::new();
    driver.push_packets(vec![packet(3), packet(1), packet(2)]);
    let mut capture = NetworkCapture::new(driver.clone());

    capture.begin("joblist.json").await.unwrap();
    let sequences: Vec<u64> = capture
        .await_packets(Duration::from_secs(5))
        .await
        .unwrap()
        .iter()
        .map(ResponsePacket::sequence)
        .collect();

    assert_eq!(sequences, [1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_yields_empty_batch() {
    let driver = FakeDriver::new();
    let mut capture = NetworkCapture::new(driver.clone());
    capture.begin("joblist.json").await.unwrap();

    let start = tokio::time::Instant::now();
    let packets = capture.await_packets(Duration::from_secs(10)).await.unwrap();

    assert!(packets.is_empty());
    assert!(start.elapsed() >= Duration::from_secs(10));
}

#[tokio::test]
async fn test_rearm_replaces_pattern() {
    let driver = FakeDriver::new();
    let mut capture = NetworkCapture::new(driver.clone());

    capture.begin("joblist.json").await.unwrap();
    capture.begin("search.json").await.unwrap();

    assert_eq!(capture.pattern(), Some("search.json"));
    assert_eq!(driver.begins(), ["joblist.json", "search.json"]);
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let driver = FakeDriver::new();
    let mut capture = NetworkCapture::new(driver.clone());

    capture.stop().await.unwrap();
    assert_eq!(driver.stops(), 0);

    capture.begin("joblist.json").await.unwrap();
    assert!(capture.is_armed());
    capture.stop().await.unwrap();
    capture.stop().await.unwrap();

    assert!(!capture.is_armed());
    assert_eq!(driver.stops(), 1);
}
