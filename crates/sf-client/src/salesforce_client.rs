//! Authenticated Salesforce client.
//!
//! `SalesforceClient` pairs an instance URL and bearer token with an
//! [`SfHttpClient`] and builds the REST and Bulk API 2.0 URLs. The token is
//! redacted in Debug output and skipped in tracing spans.

use serde::{de::DeserializeOwned, Serialize};
use tracing::instrument;

use crate::client::SfHttpClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::request::{RequestBuilder, RequestMethod};
use crate::response::Response;

/// Authenticated client shared by the bulk and REST crates.
///
/// Cloning is cheap; clones share the connection pool.
///
/// ```rust,ignore
/// use forcepipe_client::{ClientConfig, SalesforceClient};
///
/// let config = ClientConfig::builder().with_api_version("61.0").build()?;
/// let client = SalesforceClient::with_config(instance_url, token, config)?;
/// assert!(client.bulk_url("ingest").ends_with("/services/data/v61.0/jobs/ingest"));
/// ```
#[derive(Clone)]
pub struct SalesforceClient {
    http: SfHttpClient,
    instance_url: String,
    access_token: String,
    api_version: String,
}

impl std::fmt::Debug for SalesforceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceClient")
            .field("instance_url", &self.instance_url)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl SalesforceClient {
    /// Create a client with the default configuration.
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        Self::with_config(instance_url, access_token, ClientConfig::default())
    }

    /// Create a client with a custom configuration.
    pub fn with_config(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let instance_url = instance_url.into().trim_end_matches('/').to_string();
        url::Url::parse(&instance_url)?;

        let api_version = config.api_version.clone();
        Ok(Self {
            http: SfHttpClient::new(config)?,
            instance_url,
            access_token: access_token.into(),
            api_version,
        })
    }

    /// Override the API version (e.g. "60.0").
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        self.http.config()
    }

    /// REST API URL: `rest_url("composite/sobjects")`.
    pub fn rest_url(&self, path: &str) -> String {
        format!(
            "{}/services/data/v{}/{}",
            self.instance_url,
            self.api_version,
            path.trim_start_matches('/')
        )
    }

    /// Bulk API 2.0 URL: `bulk_url("ingest/750xx/batches")`.
    pub fn bulk_url(&self, path: &str) -> String {
        self.rest_url(&format!("jobs/{}", path.trim_start_matches('/')))
    }

    /// Start an authenticated request.
    pub fn request(&self, method: RequestMethod, url: &str) -> RequestBuilder {
        self.http.request(method, url).bearer_auth(&self.access_token)
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(RequestMethod::Get, url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(RequestMethod::Post, url)
    }

    pub fn patch(&self, url: &str) -> RequestBuilder {
        self.request(RequestMethod::Patch, url)
    }

    pub fn put(&self, url: &str) -> RequestBuilder {
        self.request(RequestMethod::Put, url)
    }

    pub fn delete(&self, url: &str) -> RequestBuilder {
        self.request(RequestMethod::Delete, url)
    }

    /// Execute a request and return the raw response.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        self.http.execute(request).await
    }

    /// Execute a request and deserialize its JSON body.
    pub async fn execute_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.http.send_json(request).await
    }

    /// GET with JSON response deserialization.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.execute_json(self.get(url)).await
    }

    /// POST a JSON body and deserialize the JSON response.
    #[instrument(skip(self, body), fields(url = %url))]
    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        self.execute_json(self.post(url).json(body)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_url_building() {
        let client = SalesforceClient::new("https://na1.salesforce.com/", "token123").unwrap();

        assert_eq!(client.instance_url(), "https://na1.salesforce.com");
        assert_eq!(
            client.rest_url("composite/sobjects"),
            "https://na1.salesforce.com/services/data/v62.0/composite/sobjects"
        );
        assert_eq!(
            client.bulk_url("/ingest"),
            "https://na1.salesforce.com/services/data/v62.0/jobs/ingest"
        );
    }

    #[test]
    fn test_api_version_from_config_and_override() {
        let config = ClientConfig::builder().with_api_version("59.0").build().unwrap();
        let client =
            SalesforceClient::with_config("https://na1.salesforce.com", "t", config).unwrap();
        assert_eq!(client.api_version(), "59.0");

        let client = client.with_api_version("60.0");
        assert_eq!(
            client.bulk_url("query"),
            "https://na1.salesforce.com/services/data/v60.0/jobs/query"
        );
    }

    #[test]
    fn test_invalid_instance_url() {
        let err = SalesforceClient::new("not a url", "token").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidUrl(_)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = SalesforceClient::new("https://na1.salesforce.com", "secret-token").unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
