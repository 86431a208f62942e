mod common;

use common::{failure, ids, job_page, FakeDriver, ScriptedPrompt};
use std::sync::Arc;
use std::time::Duration;
use trawl_browser::BrowserError;
use trawl_codes::{CodeRegistry, CodeTable};
use trawl_collector::{
    CollectError, CollectionSummary, CollectorSettings, FailureKind, JsonFileSink,
    PacingController, PersistenceSink, RunStatus, SearchOrchestrator, RAW_RESPONSE_FILE,
};
use trawl_core::{
    FilterField, NoCodes, PacingConfig, PaginationMode, ScrollMode, SearchQuery,
};

fn orchestrator(driver: &Arc<FakeDriver>) -> SearchOrchestrator {
    SearchOrchestrator::new(
        driver.clone(),
        Arc::new(NoCodes),
        CollectorSettings::default(),
    )
    .with_pacing(PacingController::with_seed(PacingConfig::default(), 42))
}

fn python_query() -> SearchQuery {
    SearchQuery::keywords("Python").with_city("北京")
}

fn pages(max_pages: u32) -> PaginationMode {
    PaginationMode::Page { max_pages }
}

fn auto_scroll(max_scrolls: u32) -> PaginationMode {
    PaginationMode::Scroll {
        mode: ScrollMode::Auto,
        max_scrolls,
    }
}

fn manual_scroll(max_scrolls: u32) -> PaginationMode {
    PaginationMode::Scroll {
        mode: ScrollMode::Manual,
        max_scrolls,
    }
}

#[tokio::test(start_paused = true)]
async fn test_page_mode_stops_at_page_limit() {
    let driver = FakeDriver::new();
    for page in 0..5 {
        driver.push_json(job_page(&ids(&format!("p{page}"), 15), true, 300));
    }

    let outcome = orchestrator(&driver)
        .run(&python_query(), pages(3))
        .await
        .expect("run");

    assert_eq!(outcome.status, RunStatus::Terminated);
    assert_eq!(outcome.records.len(), 45);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.total_count, Some(300));

    let navigations = driver.navigations();
    assert_eq!(navigations.len(), 3);
    for (i, url) in navigations.iter().enumerate() {
        assert!(url.contains(&format!("page={}", i + 1)), "{url}");
        assert!(url.contains("pageSize=15"), "{url}");
    }
    assert_eq!(driver.stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_page_mode_stops_when_site_reports_no_more() {
    let driver = FakeDriver::new();
    driver.push_json(job_page(&ids("a", 15), true, 30));
    driver.push_json(job_page(&ids("b", 15), false, 30));
    driver.push_json(job_page(&ids("c", 15), true, 30));

    let outcome = orchestrator(&driver)
        .run(&python_query(), pages(5))
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(driver.navigations().len(), 2);
    assert_eq!(outcome.records.len(), 30);
}

#[tokio::test(start_paused = true)]
async fn test_page_mode_stops_on_empty_page() {
    let driver = FakeDriver::new();
    driver.push_json(job_page(&ids("a", 15), true, 15));
    driver.push_json(job_page(&[], true, 15));

    let outcome = orchestrator(&driver)
        .run(&python_query(), pages(5))
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(driver.navigations().len(), 2);
    assert_eq!(outcome.records.len(), 15);
}

#[tokio::test(start_paused = true)]
async fn test_page_mode_starts_from_requested_page() {
    let driver = FakeDriver::new();
    driver.push_json(job_page(&ids("a", 15), true, 90));
    driver.push_json(job_page(&ids("b", 15), true, 90));

    orchestrator(&driver)
        .run(&python_query().with_page(2), pages(3))
        .await
        .unwrap();

    let navigations = driver.navigations();
    assert_eq!(navigations.len(), 2);
    assert!(navigations[0].contains("page=2"));
    assert!(navigations[1].contains("page=3"));
}

#[tokio::test(start_paused = true)]
async fn test_duplicates_across_pages_are_dropped() {
    let driver = FakeDriver::new();
    let first = ids("a", 15);
    let mut second = first[10..].to_vec();
    second.extend(ids("b", 10));
    driver.push_json(job_page(&first, true, 25));
    driver.push_json(job_page(&second, false, 25));

    let outcome = orchestrator(&driver)
        .run(&python_query(), pages(5))
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 25);
    let mut seen: Vec<_> = outcome.records.iter().map(|r| r.job_id.clone()).collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 25);
}

#[tokio::test(start_paused = true)]
async fn test_batch_packets_processed_in_arrival_order() {
    let driver = FakeDriver::new();
    driver.push_texts(vec![
        job_page(&ids("a", 3), true, 6).to_string(),
        job_page(&ids("b", 3), false, 6).to_string(),
    ]);

    let outcome = orchestrator(&driver)
        .run(&python_query(), pages(5))
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.packets_processed, 2);
    assert_eq!(outcome.records[0].job_id, "a-0");
    assert_eq!(outcome.records[5].job_id, "b-2");
    // Last packet said no more pages
    assert_eq!(driver.navigations().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_python_beijing_end_to_end() {
    let driver = FakeDriver::new();
    driver.push_json(job_page(&ids("py", 15), true, 20));
    driver.push_json(job_page(&ids("py2", 5), false, 20));

    let codes = CodeRegistry::from_tables([CodeTable::from_pairs(
        FilterField::City,
        [("北京", "101010100")],
    )])
    .unwrap();
    let mut orchestrator =
        SearchOrchestrator::new(driver.clone(), Arc::new(codes), CollectorSettings::default());

    let query = python_query().with_page_size(15);
    let outcome = orchestrator.run(&query, pages(5)).await.unwrap();

    assert_eq!(outcome.status, RunStatus::Terminated);
    assert_eq!(outcome.records.len(), 20);
    assert_eq!(outcome.total_count, Some(20));
    assert!(driver.navigations()[0].contains("city=101010100"));
    assert!(driver.navigations()[0].contains("query=Python"));

    let temp_dir = tempfile::TempDir::new().unwrap();
    let summary = CollectionSummary::from_outcome(&outcome);
    let path = JsonFileSink::new(temp_dir.path())
        .save(&outcome.records, &summary)
        .unwrap();

    assert_eq!(summary.city_distribution[0].count, 20);
    assert_eq!(summary.run.as_ref().unwrap().status, "terminated");
    assert_eq!(JsonFileSink::load(&path).unwrap(), outcome.records);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_requests_fail_before_browser_work() {
    let driver = FakeDriver::new();
    let mut orchestrator = orchestrator(&driver);

    let cases = [
        (python_query().with_page_size(0), pages(5)),
        (python_query().with_page_size(101), pages(5)),
        (SearchQuery::default(), pages(5)),
        (python_query(), pages(0)),
        (python_query().with_page(4), pages(3)),
        (python_query(), manual_scroll(5)),
    ];

    for (query, mode) in cases {
        let result = orchestrator.run(&query, mode).await;
        assert!(
            matches!(result, Err(CollectError::Validation(_))),
            "{query:?} {mode:?} -> {result:?}"
        );
    }

    assert!(driver.navigations().is_empty());
    assert!(driver.begins().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_first_page_timeout_reports_no_data() {
    let driver = FakeDriver::new();
    driver.set_body("<title>安全验证</title>");

    let outcome = orchestrator(&driver)
        .run(&python_query(), pages(3))
        .await
        .unwrap();

    assert_eq!(outcome.failure_kind(), Some(FailureKind::NoData));
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.packets_processed, 0);
    assert_eq!(driver.stops(), 1);
    assert!(!driver.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_throttle_keeps_partial_results_and_is_not_retried() {
    let driver = FakeDriver::new();
    driver.push_json(job_page(&ids("a", 15), true, 100));
    driver.push_json(failure(37, "您的访问行为异常"));

    let outcome = orchestrator(&driver)
        .run(&python_query(), pages(5))
        .await
        .unwrap();

    assert_eq!(outcome.failure_kind(), Some(FailureKind::Throttled));
    assert_eq!(outcome.records.len(), 15);
    assert_eq!(driver.navigations().len(), 2);
    assert_eq!(driver.stops(), 1);
    assert!(!driver.is_closed());

    let summary = CollectionSummary::from_outcome(&outcome);
    let run = summary.run.unwrap();
    assert_eq!(run.status, "failed");
    assert_eq!(run.failure, Some(FailureKind::Throttled));
}

#[tokio::test(start_paused = true)]
async fn test_remote_failure_carries_message() {
    let driver = FakeDriver::new();
    driver.push_json(failure(5, "参数错误"));

    let outcome = orchestrator(&driver)
        .run(&python_query(), pages(5))
        .await
        .unwrap();

    let RunStatus::Failed { kind, message } = outcome.status else {
        panic!("expected failure");
    };
    assert_eq!(kind, FailureKind::Remote);
    assert!(message.contains("参数错误"));
    assert_eq!(driver.stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_undecodable_payload_fails_run() {
    let driver = FakeDriver::new();
    driver.push_json(job_page(&ids("a", 15), true, 30));
    driver.push_texts(vec!["<html>not json</html>".to_string()]);

    let outcome = orchestrator(&driver)
        .run(&python_query(), pages(5))
        .await
        .unwrap();

    assert_eq!(outcome.failure_kind(), Some(FailureKind::Decode));
    assert_eq!(outcome.records.len(), 15);
    assert_eq!(outcome.packets_processed, 2);
    assert_eq!(driver.stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transient_navigation_failure_is_retried() {
    let driver = FakeDriver::new();
    driver.fail_next_navigation(BrowserError::NavigationError(
        "net::ERR_CONNECTION_RESET".to_string(),
    ));
    driver.push_json(job_page(&ids("a", 10), false, 10));

    let outcome = orchestrator(&driver)
        .run(&python_query(), pages(5))
        .await
        .unwrap();

    assert!(outcome.is_success());
    let navigations = driver.navigations();
    assert_eq!(navigations.len(), 2);
    assert_eq!(navigations[0], navigations[1]);
    // Capture re-armed for the second attempt
    assert_eq!(driver.begins().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_close_session() {
    let driver = FakeDriver::new();
    for _ in 0..3 {
        driver.fail_next_navigation(BrowserError::Timeout("page load".to_string()));
    }

    let outcome = orchestrator(&driver)
        .run(&python_query(), pages(5))
        .await
        .unwrap();

    assert_eq!(outcome.failure_kind(), Some(FailureKind::Driver));
    assert_eq!(driver.navigations().len(), 3);
    assert_eq!(driver.stops(), 1);
    assert!(driver.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_fatal_driver_error_is_not_retried() {
    let driver = FakeDriver::new();
    driver.fail_next_navigation(BrowserError::ChromiumError("target crashed".to_string()));

    let outcome = orchestrator(&driver)
        .run(&python_query(), pages(5))
        .await
        .unwrap();

    assert_eq!(outcome.failure_kind(), Some(FailureKind::Driver));
    assert_eq!(driver.navigations().len(), 1);
    assert_eq!(driver.stops(), 1);
    assert!(driver.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_auto_scroll_stops_after_empty_streak() {
    let driver = FakeDriver::new();
    let initial = ids("a", 15);
    driver.push_json(job_page(&initial, true, 100));
    driver.push_json(job_page(&ids("b", 5), true, 100));
    driver.push_timeout();
    driver.push_json(job_page(&initial, true, 100));

    let outcome = orchestrator(&driver)
        .run(&python_query(), auto_scroll(10))
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.records.len(), 20);
    assert_eq!(driver.scrolls(), 3);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(driver.navigations().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_auto_scroll_honors_scroll_limit() {
    let driver = FakeDriver::new();
    for batch in 0..5 {
        driver.push_json(job_page(&ids(&format!("s{batch}"), 5), true, 100));
    }

    let outcome = orchestrator(&driver)
        .run(&python_query(), auto_scroll(2))
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(driver.scrolls(), 2);
    assert_eq!(outcome.records.len(), 15);
}

#[tokio::test(start_paused = true)]
async fn test_auto_scroll_skipped_without_result_list() {
    let driver = FakeDriver::new();
    driver.hide_result_list();
    driver.push_json(job_page(&ids("a", 15), true, 100));

    let outcome = orchestrator(&driver)
        .run(&python_query(), auto_scroll(10))
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(driver.scrolls(), 0);
    assert_eq!(outcome.records.len(), 15);
}

#[tokio::test(start_paused = true)]
async fn test_scroll_mode_tolerates_empty_initial_load() {
    let driver = FakeDriver::new();
    driver.push_timeout();
    driver.push_json(job_page(&ids("late", 5), true, 5));

    let outcome = orchestrator(&driver)
        .run(&python_query(), auto_scroll(3))
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.records.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_manual_scroll_follows_operator() {
    let driver = FakeDriver::new();
    driver.push_json(job_page(&ids("a", 15), true, 100));
    driver.push_json(job_page(&ids("b", 5), true, 100));
    driver.push_timeout();

    let (prompt, asked) = ScriptedPrompt::new(&[true, true]);
    let mut orchestrator = orchestrator(&driver).with_prompt(Box::new(prompt));

    let outcome = orchestrator
        .run(&python_query(), manual_scroll(10))
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.records.len(), 20);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(driver.scrolls(), 0);
    assert_eq!(*asked.lock().unwrap(), vec![(1, 15), (2, 20), (3, 20)]);
}

#[tokio::test(start_paused = true)]
async fn test_manual_scroll_bounded_by_limit() {
    let driver = FakeDriver::new();
    driver.push_json(job_page(&ids("a", 15), true, 100));

    let (prompt, asked) = ScriptedPrompt::new(&[true; 5]);
    let mut orchestrator = orchestrator(&driver).with_prompt(Box::new(prompt));

    let outcome = orchestrator
        .run(&python_query(), manual_scroll(2))
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(asked.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_auto_scroll_throttle_keeps_partial_results() {
    let driver = FakeDriver::new();
    driver.push_json(job_page(&ids("a", 15), true, 100));
    driver.push_json(failure(37, "您的访问行为异常"));
    driver.push_json(job_page(&ids("b", 15), true, 100));

    let outcome = orchestrator(&driver)
        .run(&python_query(), auto_scroll(10))
        .await
        .unwrap();

    assert_eq!(outcome.failure_kind(), Some(FailureKind::Throttled));
    assert_eq!(outcome.records.len(), 15);
    assert_eq!(driver.scrolls(), 1);
    assert_eq!(driver.navigations().len(), 1);
    assert_eq!(driver.stops(), 1);
    assert!(!driver.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_decode_failure_stops_capture() {
    let driver = FakeDriver::new();
    driver.push_json(job_page(&ids("a", 15), true, 100));
    driver.push_json(job_page(&ids("b", 5), true, 100));
    driver.push_texts(vec!["<html>验证</html>".to_string()]);

    let outcome = orchestrator(&driver)
        .run(&python_query(), auto_scroll(10))
        .await
        .unwrap();

    assert_eq!(outcome.failure_kind(), Some(FailureKind::Decode));
    assert_eq!(outcome.records.len(), 20);
    assert_eq!(outcome.packets_processed, 3);
    assert_eq!(driver.scrolls(), 2);
    assert_eq!(driver.stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_manual_scroll_remote_failure_keeps_records() {
    let driver = FakeDriver::new();
    driver.push_json(job_page(&ids("a", 15), true, 100));
    driver.push_json(failure(5, "参数错误"));

    let (prompt, asked) = ScriptedPrompt::new(&[true, true, true]);
    let mut orchestrator = orchestrator(&driver).with_prompt(Box::new(prompt));

    let outcome = orchestrator
        .run(&python_query(), manual_scroll(10))
        .await
        .unwrap();

    assert_eq!(outcome.failure_kind(), Some(FailureKind::Remote));
    assert_eq!(outcome.records.len(), 15);
    assert_eq!(asked.lock().unwrap().len(), 1);
    assert_eq!(driver.stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_raw_dump_keeps_last_response() {
    let driver = FakeDriver::new();
    driver.push_json(job_page(&ids("a", 15), true, 30));
    driver.push_json(job_page(&ids("b", 15), false, 30));

    let temp_dir = tempfile::TempDir::new().unwrap();
    let mut orchestrator =
        orchestrator(&driver).with_raw_dump(JsonFileSink::new(temp_dir.path()));
    let outcome = orchestrator.run(&python_query(), pages(5)).await.unwrap();
    assert!(outcome.is_success());

    let raw = std::fs::read_to_string(temp_dir.path().join(RAW_RESPONSE_FILE)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["zpData"]["hasMore"], false);
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_establish_session_visits_home_then_landing() {
    let driver = FakeDriver::new();
    let mut orchestrator = orchestrator(&driver);

    let start = tokio::time::Instant::now();
    orchestrator.establish_session().await.unwrap();

    assert_eq!(
        driver.navigations(),
        vec![
            "https://www.zhipin.com".to_string(),
            "https://www.zhipin.com/web/geek/job".to_string(),
        ]
    );
    assert!(driver.begins().is_empty());
    // initial_access (>= 2s) plus search_access (>= 3s)
    assert!(start.elapsed() >= Duration::from_secs(5));
}
