#![allow(dead_code)]

use remote_log::Config;
use remote_log::sender::DeliveryEnvelope;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const TOKEN: &str = "test-token";
pub const COLLECT_PATH: &str = "/api/collectLog";

pub fn config_for(server: &MockServer, error_dir: &Path) -> Config {
    Config {
        flush_interval_ms: 60_000,
        request_timeout_secs: 5,
        shutdown_grace_ms: 2_000,
        ..Config::new(server.uri(), TOKEN, error_dir)
    }
}

pub fn collector_reply(code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "code": code, "message": message }))
}

/// Accepts every delivery.
pub async fn mount_accepting_collector(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(COLLECT_PATH))
        .and(query_param("pwd", TOKEN))
        .respond_with(collector_reply(200, "ok"))
        .mount(server)
        .await;
}

/// Rejects the next `times` deliveries with a non-200 code.
pub async fn mount_rejections(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path(COLLECT_PATH))
        .respond_with(collector_reply(500, "collector busy"))
        .up_to_n_times(times)
        .mount(server)
        .await;
}

pub async fn collect_requests(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == COLLECT_PATH)
        .collect()
}

pub fn envelope_of(request: &Request) -> DeliveryEnvelope {
    serde_json::from_slice(&request.body).expect("collector body is an envelope")
}

pub fn entries_of(request: &Request) -> Vec<String> {
    envelope_of(request).entries().expect("envelope decodes")
}

/// Polls until `count` collect requests arrived or `timeout` passes.
pub async fn wait_for_requests(server: &MockServer, count: usize, timeout: Duration) -> Vec<Request> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let requests = collect_requests(server).await;
        if requests.len() >= count || tokio::time::Instant::now() >= deadline {
            return requests;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

pub async fn wait_until<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
