use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use forcepipe_client::security;

use crate::error::{Error, ErrorKind, Result};
use crate::query::QueryResult;

use super::SalesforceRestClient;

impl SalesforceRestClient {
    /// Run a SOQL query and collect every page, following `nextRecordsUrl`
    /// until the server reports `done`.
    ///
    /// Values interpolated into a WHERE clause must be escaped by the caller.
    /// Use [`query_fields`](Self::query_fields) to build the SELECT from
    /// checked names.
    #[instrument(skip(self))]
    pub async fn query<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>> {
        if soql.trim().is_empty() {
            return Err(Error::validation("query is empty"));
        }
        let url = format!(
            "{}?q={}",
            self.client.rest_url("query"),
            security::encode_param(soql)
        );
        let mut page: QueryResult<T> = self.client.get_json(&url).await?;
        let total = page.total_size;
        let mut records = std::mem::take(&mut page.records);
        let mut pages = 1;

        while !page.done {
            let Some(next) = page.next_records_url.take() else {
                break;
            };
            // Only follow paths on this instance; the token goes with the request.
            if !next.starts_with("/services/data/") {
                return Err(Error::new(ErrorKind::Client(format!(
                    "unexpected nextRecordsUrl: {next:?}"
                ))));
            }
            let url = format!("{}{}", self.client.instance_url(), next);
            page = self.client.get_json(&url).await?;
            records.append(&mut page.records);
            pages += 1;
        }

        debug!(total, fetched = records.len(), pages, "Query complete");
        Ok(records)
    }

    /// Query `fields` of every `sobject` record, building the SELECT from
    /// checked names.
    pub async fn query_fields<T: DeserializeOwned>(
        &self,
        sobject: &str,
        fields: &[&str],
    ) -> Result<Vec<T>> {
        let soql = security::select_statement(sobject, fields)?;
        self.query(&soql).await
    }
}
