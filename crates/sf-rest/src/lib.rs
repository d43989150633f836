//! # forcepipe-rest
//!
//! Synchronous record writes through the sObject, sObject Collections and
//! Composite APIs, sharing the forcepipe batch partitioner with the bulk
//! pipelines, plus paged SOQL queries.
//!
//! ## Features
//!
//! - **Single records** - `insert_one`, `update_one`, `upsert_one` and
//!   `delete_one`, one request each
//! - **SOQL** - `query` collects every page by following `nextRecordsUrl`
//! - **SObject Collections** - insert, update, upsert and delete in batches
//!   of up to 200 records, one request per batch
//! - **Composite API** - the same batches sent as subrequests, up to 25 per
//!   `/composite` call
//!
//! Records are anything implementing [`Record`]: `Serialize` structs, maps
//! and JSON objects. Results come back in input order.
//!
//! ## Example
//!
//! ```rust,ignore
//! use forcepipe_rest::SalesforceRestClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), forcepipe_rest::Error> {
//!     let client = SalesforceRestClient::new(
//!         "https://myorg.my.salesforce.com",
//!         "access_token_here",
//!     )?;
//!
//!     let accounts = vec![
//!         serde_json::json!({"Name": "Acme"}),
//!         serde_json::json!({"Name": "Globex"}),
//!     ];
//!     let results = client.insert_collection("Account", &accounts, 200, false).await?;
//!     println!("{} written, errors: {}", results.len(), results.has_errors());
//!
//!     Ok(())
//! }
//! ```

mod client;
mod collections;
mod composite;
mod error;
mod query;

pub use client::SalesforceRestClient;

pub use collections::CollectionRequest;

pub use composite::{
    CompositeRequest, CompositeResponse, CompositeSubrequest, CompositeSubresponse,
    MAX_SUBREQUESTS,
};

pub use error::{Error, ErrorKind, Result};

pub use query::QueryResult;

pub use forcepipe_client::{
    ClientConfig, ClientConfigBuilder, Record, SalesforceError, SalesforceResult,
    SalesforceResults,
};
