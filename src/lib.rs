//! # forcepipe
//!
//! Salesforce bulk data pipelines for Rust.
//!
//! Records go in as any `Serialize` type; the library partitions them into
//! batches, encodes them as CSV, drives Bulk API 2.0 jobs through their
//! lifecycle and pages results back through `Sforce-Locator`. Smaller writes
//! can take the synchronous sObject Collections and Composite paths, which
//! share the same partitioner.
//!
//! ## Crates
//!
//! - **forcepipe-client** - HTTP transport with retry, configuration, the
//!   record capability and the batch partitioner
//! - **forcepipe-auth** - credentials and authenticated client construction
//! - **forcepipe-bulk** - Bulk API 2.0 ingest, query iteration and export
//! - **forcepipe-rest** - sObject Collections and Composite writes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use forcepipe::{BulkApiClient, CancellationToken, ClientConfig, SalesforceCredentials, Wait};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let creds = SalesforceCredentials::from_env()?;
//!     let client = BulkApiClient::from_credentials(&creds, ClientConfig::default())?;
//!     let cancel = CancellationToken::new();
//!
//!     let outcome = client
//!         .upsert_bulk(&cancel, "Account", "External_Id__c", &accounts, 10_000, Wait::Results)
//!         .await?;
//!     for failure in outcome.results.iter().flat_map(|r| r.failures()) {
//!         eprintln!("{:?}", failure.errors);
//!     }
//!
//!     let mut pages = client
//!         .query_bulk_iterator(&cancel, "SELECT Id, Name FROM Account")
//!         .await?;
//!     while let Some(rows) = pages.next_records::<serde_json::Value>(&cancel).await? {
//!         println!("{} rows", rows.len());
//!     }
//!     Ok(())
//! }
//! ```

#[cfg(feature = "auth")]
pub use forcepipe_auth as auth;
#[cfg(feature = "bulk")]
pub use forcepipe_bulk as bulk;
#[cfg(feature = "client")]
pub use forcepipe_client as client;
#[cfg(feature = "rest")]
pub use forcepipe_rest as rest;

#[cfg(feature = "auth")]
pub use forcepipe_auth::{Credentials, SalesforceCredentials};
#[cfg(feature = "bulk")]
pub use forcepipe_bulk::{BulkApiClient, BulkOperation, ResultIterator, ResultSource, Wait};
#[cfg(feature = "client")]
pub use forcepipe_client::{
    BatchLimit, ClientConfig, Record, SalesforceClient, SalesforceError, SalesforceResult,
    SalesforceResults,
};
#[cfg(feature = "rest")]
pub use forcepipe_rest::SalesforceRestClient;

pub use tokio_util::sync::CancellationToken;
