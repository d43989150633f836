//! Bulk API 2.0 client.
//!
//! [`BulkApiClient`] is split by concern:
//!
//! - `job`: the job lifecycle (create, upload, close, abort, status, polling)
//! - `ingest`: the insert/update/upsert/delete pipelines, from records or files
//! - `query`: query jobs consumed through a [`ResultIterator`](crate::ResultIterator)
//!   or exported to a file

mod ingest;
mod job;
mod query;

use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use forcepipe_auth::Credentials;
use forcepipe_client::{ClientConfig, RequestBuilder, Response, SalesforceClient};

use crate::error::{Error, Result, Stage};
use crate::types::JobType;

pub use query::ExportSummary;

pub(crate) use job::require_complete;

/// Default interval between job status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Salesforce Bulk API 2.0 client.
///
/// Cloning is cheap and clones share the HTTP connection pool, so one client
/// can drive many pipelines concurrently. No state is shared between jobs.
///
/// Every network call takes a [`CancellationToken`]; cancelling it stops the
/// pipeline at its next await point with an [`ErrorKind::Cancelled`](crate::ErrorKind::Cancelled)
/// error naming the stage. Bulk requests are never retried by the client.
///
/// # Example
///
/// ```rust,ignore
/// use forcepipe_bulk::{BulkApiClient, Wait};
/// use tokio_util::sync::CancellationToken;
///
/// let client = BulkApiClient::new("https://myorg.my.salesforce.com", "access_token")?;
/// let cancel = CancellationToken::new();
///
/// let outcome = client
///     .insert_bulk(&cancel, "Account", &accounts, 10_000, Wait::Results)
///     .await?;
/// if outcome.has_errors() {
///     for failure in outcome.results.iter().flat_map(|r| r.failures()) {
///         eprintln!("{:?}", failure.errors);
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BulkApiClient {
    client: SalesforceClient,
    poll_interval: Duration,
}

impl BulkApiClient {
    /// Create a new Bulk API client.
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let client = SalesforceClient::new(instance_url, access_token)?;
        Ok(Self::from_client(client))
    }

    /// Create a new Bulk API client with custom HTTP configuration.
    pub fn with_config(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let client = SalesforceClient::with_config(instance_url, access_token, config)?;
        Ok(Self::from_client(client))
    }

    /// Create a client from any credential source.
    pub fn from_credentials(credentials: &impl Credentials, config: ClientConfig) -> Result<Self> {
        Ok(Self::from_client(credentials.client(config)?))
    }

    /// Create a Bulk API client from an existing SalesforceClient.
    pub fn from_client(client: SalesforceClient) -> Self {
        Self {
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Get the underlying SalesforceClient.
    pub fn inner(&self) -> &SalesforceClient {
        &self.client
    }

    pub fn instance_url(&self) -> &str {
        self.client.instance_url()
    }

    pub fn api_version(&self) -> &str {
        self.client.api_version()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Set the API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.client = self.client.with_api_version(version);
        self
    }

    /// Set the polling interval for job status checks.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub(crate) fn job_url(&self, job_type: JobType, job_id: &str) -> String {
        self.client.bulk_url(&format!(
            "{}/{}",
            job_type.path(),
            urlencoding::encode(job_id)
        ))
    }

    /// Send one request for `stage`, raced against `cancel`.
    pub(crate) async fn send(
        &self,
        stage: Stage,
        cancel: &CancellationToken,
        request: RequestBuilder,
    ) -> Result<Response> {
        if cancel.is_cancelled() {
            return Err(Error::cancelled(stage));
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::cancelled(stage)),
            result = self.client.execute(request.without_retry()) => {
                result.map_err(|err| Error::at(stage, err))
            }
        }
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        stage: Stage,
        cancel: &CancellationToken,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = self.send(stage, cancel, request).await?;
        response.json().await.map_err(|err| Error::at(stage, err))
    }
}
