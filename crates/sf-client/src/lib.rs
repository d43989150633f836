//! # forcepipe-client
//!
//! Shared infrastructure for the forcepipe crates:
//!
//! - [`ClientConfig`]: API version, batch-size ceilings, HTTP and retry settings,
//!   validated once at build time
//! - [`SalesforceClient`]: authenticated requests and URL construction
//! - [`Record`]: the capability every write path accepts
//! - [`batch`]: the partitioner shared by bulk, collection and composite calls
//! - [`SalesforceResult`] / [`SalesforceResults`]: per-record outcomes
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │            forcepipe-bulk            forcepipe-rest          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  SalesforceClient: instance URL + token, REST/Bulk URLs     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  SfHttpClient: reqwest, retry (opt-out per request),        │
//! │  compression, Salesforce error mapping                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod batch;
mod client;
mod config;
mod error;
pub mod record;
mod request;
mod response;
mod retry;
mod salesforce_client;
pub mod security;
mod types;

pub use batch::{partition, partition_records, require_field, validate_batch_size, BatchLimit};
pub use client::SfHttpClient;
pub use config::{ClientConfig, ClientConfigBuilder, CompressionConfig};
pub use error::{Error, ErrorKind, Result};
pub use record::{Fields, Record};
pub use request::{RequestBuilder, RequestMethod};
pub use response::{ApiUsage, Response, ResponseExt, LOCATOR_END};
pub use retry::{RetryConfig, RetryPolicy};
pub use salesforce_client::SalesforceClient;
pub use types::{SalesforceError, SalesforceResult, SalesforceResults};

/// Default Salesforce API version
pub const DEFAULT_API_VERSION: &str = "62.0";

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("forcepipe/", env!("CARGO_PKG_VERSION"));
