use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use forcepipe::{BulkApiClient, ClientConfig, SalesforceCredentials, SalesforceRestClient};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const API: &str = "/services/data/v62.0";

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn credentials(server: &MockServer) -> SalesforceCredentials {
    SalesforceCredentials::new(server.uri(), "test-token", "62.0")
}

fn config() -> ClientConfig {
    ClientConfig::builder()
        .without_retry()
        .build()
        .expect("valid config")
}

pub fn bulk_client(server: &MockServer) -> BulkApiClient {
    init_tracing();
    BulkApiClient::from_credentials(&credentials(server), config())
        .expect("bulk client")
        .with_poll_interval(Duration::from_millis(10))
}

pub fn rest_client(server: &MockServer) -> SalesforceRestClient {
    init_tracing();
    SalesforceRestClient::from_credentials(&credentials(server), config()).expect("rest client")
}

pub fn job_json(id: &str, state: &str, operation: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "state": state,
        "operation": operation,
        "object": "Contact",
        "columnDelimiter": "COMMA",
        "lineEnding": "LF",
        "apiVersion": 62.0
    })
}

/// Answer job status requests with `states` in turn, repeating the last one.
pub async fn mount_job_states(
    server: &MockServer,
    kind: &str,
    id: &str,
    operation: &str,
    states: &'static [&'static str],
) {
    let calls = AtomicUsize::new(0);
    let (id, operation) = (id.to_string(), operation.to_string());
    Mock::given(method("GET"))
        .and(path(format!("{API}/jobs/{kind}/{id}")))
        .respond_with(move |_: &Request| {
            let n = calls.fetch_add(1, Ordering::SeqCst).min(states.len() - 1);
            ResponseTemplate::new(200).set_body_json(job_json(&id, states[n], &operation))
        })
        .mount(server)
        .await;
}

/// Requests the server received with the given method.
pub async fn received(server: &MockServer, verb: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == verb)
        .collect()
}
