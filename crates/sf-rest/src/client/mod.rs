//! Salesforce REST client for synchronous reads and writes.
//!
//! Two batched transports share one batching plan:
//!
//! - `collections`: one sObject Collections call per batch
//! - `composite`: batches packed as subrequests into `/composite` calls
//!
//! `sobject` writes one record per call and `query` reads SOQL results.

mod collections;
mod composite;
mod query;
mod sobject;

use serde_json::Value;

use forcepipe_auth::Credentials;
use forcepipe_client::record::{collect_fields, field_text};
use forcepipe_client::{
    partition, require_field, security, validate_batch_size, BatchLimit, ClientConfig, Fields,
    Record, RequestMethod, SalesforceClient,
};

use crate::collections::{delete_query, CollectionRequest};
use crate::error::{Error, Result};

const ID_FIELD: &str = "Id";

/// Salesforce REST client for single-record writes, batched writes of up to
/// 200 records per batch, and SOQL queries.
///
/// Every batched operation validates its whole input before sending anything, then
/// writes batches in order. Per-record failures are returned in the
/// [`SalesforceResults`](forcepipe_client::SalesforceResults); only call-level
/// failures are errors. A call-level failure part way through leaves earlier
/// batches written.
///
/// # Example
///
/// ```rust,ignore
/// use forcepipe_rest::SalesforceRestClient;
///
/// let client = SalesforceRestClient::new(
///     "https://myorg.my.salesforce.com",
///     "access_token_here",
/// )?;
///
/// let results = client.insert_collection("Contact", &contacts, 200, false).await?;
/// for failure in results.failures() {
///     eprintln!("{:?}", failure.errors);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SalesforceRestClient {
    client: SalesforceClient,
}

impl SalesforceRestClient {
    /// Create a new REST client with the given instance URL and access token.
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let client = SalesforceClient::new(instance_url, access_token)?;
        Ok(Self { client })
    }

    /// Create a new REST client with custom HTTP configuration.
    pub fn with_config(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let client = SalesforceClient::with_config(instance_url, access_token, config)?;
        Ok(Self { client })
    }

    /// Create a client from any credential source.
    pub fn from_credentials(credentials: &impl Credentials, config: ClientConfig) -> Result<Self> {
        Ok(Self::from_client(credentials.client(config)?))
    }

    /// Create a REST client from an existing SalesforceClient.
    pub fn from_client(client: SalesforceClient) -> Self {
        Self { client }
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

    /// Set the API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.client = self.client.with_api_version(version);
        self
    }

    /// Validate `records` and turn them into one call per batch.
    fn plan<R: Record>(
        &self,
        write: Write<'_>,
        sobject: &str,
        records: &[R],
        batch_size: usize,
        all_or_none: bool,
    ) -> Result<Vec<BatchCall>> {
        security::require_sobject_name(sobject)?;
        if let Write::Upsert { external_id } = write {
            security::require_field_name(external_id)?;
        }
        validate_batch_size(batch_size, self.client.config().batch_max(BatchLimit::Collection))?;
        if records.is_empty() {
            return Err(Error::validation("no records to write"));
        }

        let fields = collect_fields(records)?;
        if let Some(required) = write.required_field() {
            require_field(&fields, required)?;
        }
        partition(&fields, batch_size)?
            .into_iter()
            .map(|batch| BatchCall::new(write, sobject, batch, all_or_none))
            .collect()
    }
}

/// The write a batch performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Write<'a> {
    Insert,
    Update,
    Upsert { external_id: &'a str },
    Delete,
}

impl<'a> Write<'a> {
    fn method(self) -> RequestMethod {
        match self {
            Write::Insert => RequestMethod::Post,
            Write::Update | Write::Upsert { .. } => RequestMethod::Patch,
            Write::Delete => RequestMethod::Delete,
        }
    }

    fn required_field(self) -> Option<&'a str> {
        match self {
            Write::Insert => None,
            Write::Update | Write::Delete => Some(ID_FIELD),
            Write::Upsert { external_id } => Some(external_id),
        }
    }
}

/// One sObject Collections call covering a single batch.
#[derive(Debug, Clone)]
struct BatchCall {
    method: RequestMethod,
    /// Path below `/services/data/vXX.X/`, query string included.
    path: String,
    body: Option<Value>,
    records: usize,
}

impl BatchCall {
    fn new(write: Write<'_>, sobject: &str, batch: &[Fields], all_or_none: bool) -> Result<Self> {
        let (path, body) = match write {
            Write::Delete => {
                let ids = batch
                    .iter()
                    .map(|fields| field_text(fields, ID_FIELD).unwrap_or_default())
                    .collect::<Vec<_>>();
                if let Some(bad) = ids.iter().find(|id| !security::is_valid_salesforce_id(id)) {
                    return Err(Error::validation(format!("invalid Salesforce id: {bad:?}")));
                }
                (
                    format!("composite/sobjects?{}", delete_query(&ids, all_or_none)),
                    None,
                )
            }
            Write::Upsert { external_id } => (
                format!(
                    "composite/sobjects/{}/{}",
                    security::encode_param(sobject),
                    security::encode_param(external_id)
                ),
                Some(serde_json::to_value(CollectionRequest::new(sobject, batch, all_or_none))?),
            ),
            Write::Insert | Write::Update => (
                "composite/sobjects".to_string(),
                Some(serde_json::to_value(CollectionRequest::new(sobject, batch, all_or_none))?),
            ),
        };
        Ok(Self {
            method: write.method(),
            path,
            body,
            records: batch.len(),
        })
    }
}
