//! Core HTTP client with retry, compression, and Salesforce-specific handling.

use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::request::{RequestBody, RequestBuilder, RequestMethod};
use crate::response::{Response, ResponseExt};
use crate::retry::RetryPolicy;

/// HTTP client for Salesforce APIs with built-in retry, compression, and error handling.
#[derive(Debug, Clone)]
pub struct SfHttpClient {
    inner: reqwest::Client,
    config: ClientConfig,
}

impl SfHttpClient {
    /// Create a new HTTP client from a validated configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .gzip(config.compression.accept_compressed)
            .deflate(config.compression.accept_compressed)
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))?;

        Ok(Self { inner, config })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Create a request builder for `method`.
    pub fn request(&self, method: RequestMethod, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// Execute a request, retrying retryable failures unless the request opted out.
    #[instrument(skip(self, request), fields(method = ?request.method, url = %request.url))]
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let mut retry_policy = self
            .config
            .retry
            .clone()
            .filter(|_| request.retry)
            .map(RetryPolicy::new);

        loop {
            let err = match self.execute_once(&request).await {
                Ok(response) => return response.check_salesforce_error().await,
                Err(err) => err,
            };

            let Some(policy) = retry_policy.as_mut().filter(|_| err.is_retryable()) else {
                return Err(err);
            };

            match policy.next_delay(err.retry_after()) {
                Some(delay) => {
                    warn!(
                        attempt = policy.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return Err(Error::with_source(
                        ErrorKind::RetriesExhausted {
                            attempts: policy.attempt(),
                        },
                        err,
                    ))
                }
            }
        }
    }

    /// Execute a single request without retry logic.
    async fn execute_once(&self, request: &RequestBuilder) -> Result<Response> {
        let mut req = self
            .inner
            .request(request.method.to_reqwest(), &request.url);

        if let Some(ref token) = request.bearer_token {
            req = req.bearer_auth(token);
        }
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if !request.query_params.is_empty() {
            req = req.query(&request.query_params);
        }
        if self.config.compression.accept_compressed {
            req = req.header("Accept-Encoding", "gzip, deflate");
        }
        if let Some(ref body) = request.body {
            req = match body {
                RequestBody::Json(value) => req.json(value),
                RequestBody::Text(text) => req.body(text.clone()),
                RequestBody::Bytes(bytes) => req.body(bytes.clone()),
            };
        }

        if self.config.enable_tracing {
            debug!(method = ?request.method, url = %request.url, "Sending request");
        }

        let response = Response::new(req.send().await?);
        let status = response.status();

        if self.config.enable_tracing {
            if response.is_success() {
                debug!(status, "Response received");
            } else {
                info!(status, "Non-success response");
            }
            if let Some(usage) = response.api_usage() {
                debug!(used = usage.used, remaining = usage.remaining(), "API usage");
            }
        }

        if status == 429 {
            return Err(Error::new(ErrorKind::RateLimited {
                retry_after: response.retry_after(),
            }));
        }

        // Only surface 5xx here when it would be retried; otherwise keep the
        // body so the Salesforce error payload reaches the caller.
        if matches!(status, 500 | 502 | 503 | 504) && request.retry && self.config.retry.is_some() {
            return Err(Error::new(ErrorKind::Http {
                status,
                message: format!("Server error: {}", status),
            }));
        }

        Ok(response)
    }

    /// Execute a request and deserialize the JSON response.
    pub async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T> {
        self.execute(request).await?.json().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(config: ClientConfig) -> SfHttpClient {
        SfHttpClient::new(config).unwrap()
    }

    fn no_retry() -> ClientConfig {
        ClientConfig::builder().without_retry().build().unwrap()
    }

    #[tokio::test]
    async fn test_successful_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/test"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true
            })))
            .mount(&mock_server)
            .await;

        let client = client(no_retry());
        let response = client
            .execute(
                client
                    .request(RequestMethod::Get, format!("{}/test", mock_server.uri()))
                    .bearer_auth("test-token"),
            )
            .await
            .unwrap();

        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_salesforce_error_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/error"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!([{
                "errorCode": "INVALID_FIELD",
                "message": "No such column 'foo' on entity 'Account'",
                "fields": ["foo"]
            }])))
            .mount(&mock_server)
            .await;

        let client = client(no_retry());
        let err = client
            .execute(client.request(RequestMethod::Get, format!("{}/error", mock_server.uri())))
            .await
            .unwrap_err();

        assert!(matches!(err.kind, ErrorKind::SalesforceApi { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_rate_limiting() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/limited"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&mock_server)
            .await;

        let client = client(no_retry());
        let err = client
            .execute(client.request(RequestMethod::Get, format!("{}/limited", mock_server.uri())))
            .await
            .unwrap_err();

        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_retry_on_503() {
        let mock_server = MockServer::start().await;
        let call_count = Arc::new(AtomicU32::new(0));
        let counter = call_count.clone();

        Mock::given(method("GET"))
            .and(path("/retry"))
            .respond_with(move |_: &wiremock::Request| {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    ResponseTemplate::new(503)
                } else {
                    ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true}))
                }
            })
            .mount(&mock_server)
            .await;

        let client = client(
            ClientConfig::builder()
                .with_retry(
                    crate::RetryConfig::default()
                        .with_max_attempts(3)
                        .with_initial_delay(Duration::from_millis(10)),
                )
                .build()
                .unwrap(),
        );

        let response = client
            .execute(client.request(RequestMethod::Get, format!("{}/retry", mock_server.uri())))
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_without_retry_sends_once() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client(
            ClientConfig::builder()
                .with_retry(
                    crate::RetryConfig::default().with_initial_delay(Duration::from_millis(1)),
                )
                .build()
                .unwrap(),
        );

        let err = client
            .execute(
                client
                    .request(RequestMethod::Put, format!("{}/upload", mock_server.uri()))
                    .csv("Name\nAcme\n")
                    .without_retry(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
    }
}
