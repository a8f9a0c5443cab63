mod common;

use common::*;
use remote_log::reliability::FailureRecord;
use remote_log::{Config, HttpTransport, Level};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn read_failure_records(dir: &std::path::Path) -> Vec<FailureRecord> {
    let file = dir.join(format!(
        "error_log_{}.log",
        chrono::Local::now().format("%Y-%m-%d")
    ));
    let Ok(contents) = std::fs::read_to_string(file) else {
        return Vec::new();
    };
    contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_batch_is_retried_with_identical_body_until_it_succeeds() {
    let server = MockServer::start().await;
    mount_rejections(&server, 2).await;
    mount_accepting_collector(&server).await;
    let dir = TempDir::new().unwrap();

    let config = Config {
        flush_interval_ms: 200,
        ..config_for(&server, dir.path())
    };
    let transport = HttpTransport::new(&config, Level::ALL).unwrap();

    let started = Instant::now();
    transport.submit("needs-retry".to_string()).unwrap();
    transport.submit("also-retry".to_string()).unwrap();

    assert!(wait_until(|| transport.stats().first_attempt_failures == 1, Duration::from_secs(3)).await);
    transport.wait_for_retries().await;
    let elapsed = started.elapsed();

    let requests = collect_requests(&server).await;
    assert_eq!(requests.len(), 3);
    assert!(requests.windows(2).all(|pair| pair[0].body == pair[1].body));
    assert_eq!(entries_of(&requests[2]), vec!["needs-retry", "also-retry"]);
    // Two retries, each after the fixed one second delay.
    assert!(elapsed >= Duration::from_secs(2), "retried too early: {elapsed:?}");

    let stats = transport.stats();
    assert_eq!(stats.retry_attempts, 2);
    assert_eq!(stats.entries_delivered, 2);
    assert_eq!(stats.batches_persisted, 0);
    assert!(read_failure_records(dir.path()).is_empty());

    transport.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_exhausted_batch_is_persisted_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COLLECT_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    let config = Config {
        retry_delay_ms: 50,
        flush_interval_ms: 200,
        ..config_for(&server, dir.path())
    };
    let transport = HttpTransport::new(&config, Level::ALL).unwrap();

    transport.submit("doomed-1".to_string()).unwrap();
    transport.submit("doomed-2".to_string()).unwrap();

    assert!(wait_until(|| transport.stats().first_attempt_failures == 1, Duration::from_secs(3)).await);
    transport.wait_for_retries().await;

    // Initial attempt plus three retries.
    let requests = collect_requests(&server).await;
    assert_eq!(requests.len(), 4);

    let records = read_failure_records(dir.path());
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.attempts, 4);
    assert_eq!(record.envelope, envelope_of(&requests[0]));
    assert_eq!(record.envelope.entries().unwrap(), vec!["doomed-1", "doomed-2"]);
    assert!(record.error.contains("503"), "unexpected error: {}", record.error);

    let stats = transport.stats();
    assert_eq!(stats.batches_persisted, 1);
    assert_eq!(stats.entries_persisted, 2);
    assert_eq!(stats.entries_delivered, 0);

    transport.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rejection_code_counts_as_failure() {
    let server = MockServer::start().await;
    mount_rejections(&server, 10).await;
    let dir = TempDir::new().unwrap();

    let config = Config {
        retry_delay_ms: 20,
        max_retries: 1,
        ..config_for(&server, dir.path())
    };
    let transport = HttpTransport::new(&config, Level::ALL).unwrap();

    transport.submit("rejected".to_string()).unwrap();
    transport.shutdown().await;
    transport.wait_for_retries().await;

    let records = read_failure_records(dir.path());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].attempts, 2);
    assert!(records[0].error.contains("collector busy"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_later_batch_may_arrive_before_a_retried_one() {
    let server = MockServer::start().await;
    mount_rejections(&server, 1).await;
    mount_accepting_collector(&server).await;
    let dir = TempDir::new().unwrap();

    let config = Config {
        max_batch_size: 1,
        retry_delay_ms: 300,
        ..config_for(&server, dir.path())
    };
    let transport = HttpTransport::new(&config, Level::ALL).unwrap();

    transport.submit("first".to_string()).unwrap();
    transport.submit("second".to_string()).unwrap();

    let requests = wait_for_requests(&server, 3, Duration::from_secs(5)).await;
    let order: Vec<Vec<String>> = requests.iter().map(entries_of).collect();
    assert_eq!(
        order,
        vec![
            vec!["first".to_string()],
            vec!["second".to_string()],
            vec!["first".to_string()],
        ]
    );

    transport.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unwritable_failure_dir_loses_entries_without_panicking() {
    let server = MockServer::start().await;
    mount_rejections(&server, 10).await;
    let dir = TempDir::new().unwrap();
    let failure_dir = dir.path().join("failures");

    let config = Config {
        retry_delay_ms: 20,
        max_retries: 1,
        ..config_for(&server, &failure_dir)
    };
    let transport = HttpTransport::new(&config, Level::ALL).unwrap();

    // Replace the directory with a plain file so appends fail.
    std::fs::remove_dir_all(&failure_dir).unwrap();
    std::fs::write(&failure_dir, b"not a directory").unwrap();

    transport.submit("lost".to_string()).unwrap();
    transport.shutdown().await;
    transport.wait_for_retries().await;

    let stats = transport.stats();
    assert_eq!(stats.entries_lost, 1);
    assert_eq!(stats.entries_persisted, 0);
    assert_eq!(stats.entries_accounted(), 1);
}
