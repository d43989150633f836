//! # forcepipe-bulk
//!
//! Salesforce Bulk API 2.0 pipelines for large data sets.
//!
//! ## Features
//!
//! - **Ingest** - insert, update, upsert and delete from in-memory records or
//!   CSV files, partitioned into batches of up to 10,000 rows and uploaded in
//!   order to a single job
//! - **Assignment rules** - `*_assign` variants for Leads and Cases
//! - **Job lifecycle** - create, upload, close, abort and poll, every step
//!   cancellable through a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! - **Result paging** - [`ResultIterator`] follows `Sforce-Locator` one page
//!   at a time and decodes pages into typed records
//! - **Export** - stream a query's results to a CSV file
//!
//! Validation failures are reported before any request is sent. Per-record
//! failures inside a completed job are returned as data
//! ([`SalesforceResults::has_errors`]), not as errors.
//!
//! ## Example - Bulk Insert
//!
//! ```rust,ignore
//! use forcepipe_bulk::{BulkApiClient, Wait};
//! use serde::Serialize;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Serialize)]
//! struct Account {
//!     #[serde(rename = "Name")]
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), forcepipe_bulk::Error> {
//!     let client = BulkApiClient::new("https://myorg.my.salesforce.com", "access_token")?;
//!     let accounts: Vec<Account> = load_accounts();
//!
//!     let outcome = client
//!         .insert_bulk(&CancellationToken::new(), "Account", &accounts, 10_000, Wait::Results)
//!         .await?;
//!
//!     println!("job {:?}, errors: {}", outcome.job_ids, outcome.has_errors());
//!     Ok(())
//! }
//! ```
//!
//! ## Example - Paged Query
//!
//! ```rust,ignore
//! let cancel = CancellationToken::new();
//! let mut pages = client.query_bulk_iterator(&cancel, "SELECT Id, Name FROM Account").await?;
//! while let Some(accounts) = pages.next_records::<Account>(&cancel).await? {
//!     process(accounts);
//! }
//! ```

mod client;
pub mod codec;
mod error;
mod iterator;
mod types;

pub use client::{BulkApiClient, ExportSummary, DEFAULT_POLL_INTERVAL};
pub use error::{Error, ErrorKind, Result, Stage};
pub use iterator::{ResultIterator, ResultSource};
pub use types::*;

pub use forcepipe_client::{Record, SalesforceError, SalesforceResult, SalesforceResults};
