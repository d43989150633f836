//! SOQL query result pages.

use serde::{Deserialize, Serialize};

/// One page of a REST SOQL query.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryResult<T> {
    /// Number of records matching the query, across all pages.
    #[serde(rename = "totalSize")]
    pub total_size: u64,

    /// Whether this is the last page.
    pub done: bool,

    /// Path of the next page, relative to the instance URL.
    #[serde(rename = "nextRecordsUrl", default)]
    pub next_records_url: Option<String>,

    pub records: Vec<T>,
}
