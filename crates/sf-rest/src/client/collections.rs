use tracing::{debug, instrument, warn};

use forcepipe_client::{Record, SalesforceResult, SalesforceResults};

use crate::error::Result;

use super::{BatchCall, SalesforceRestClient, Write};

impl SalesforceRestClient {
    /// Create records, one sObject Collections request per batch of up to
    /// `batch_size` (at most 200).
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn insert_collection<R: Record>(
        &self,
        sobject: &str,
        records: &[R],
        batch_size: usize,
        all_or_none: bool,
    ) -> Result<SalesforceResults> {
        let calls = self.plan(Write::Insert, sobject, records, batch_size, all_or_none)?;
        self.run_collections(calls).await
    }

    /// Update records by `Id`.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn update_collection<R: Record>(
        &self,
        sobject: &str,
        records: &[R],
        batch_size: usize,
        all_or_none: bool,
    ) -> Result<SalesforceResults> {
        let calls = self.plan(Write::Update, sobject, records, batch_size, all_or_none)?;
        self.run_collections(calls).await
    }

    /// Upsert records matched on `external_id_field`, which every record must
    /// carry.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn upsert_collection<R: Record>(
        &self,
        sobject: &str,
        external_id_field: &str,
        records: &[R],
        batch_size: usize,
        all_or_none: bool,
    ) -> Result<SalesforceResults> {
        let write = Write::Upsert {
            external_id: external_id_field,
        };
        let calls = self.plan(write, sobject, records, batch_size, all_or_none)?;
        self.run_collections(calls).await
    }

    /// Delete records by `Id`. Only the `Id` of each record is sent.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn delete_collection<R: Record>(
        &self,
        sobject: &str,
        records: &[R],
        batch_size: usize,
        all_or_none: bool,
    ) -> Result<SalesforceResults> {
        let calls = self.plan(Write::Delete, sobject, records, batch_size, all_or_none)?;
        self.run_collections(calls).await
    }

    async fn run_collections(&self, calls: Vec<BatchCall>) -> Result<SalesforceResults> {
        let mut results = SalesforceResults::new();
        for (index, call) in calls.into_iter().enumerate() {
            let url = self.client.rest_url(&call.path);
            let mut request = self.client.request(call.method, &url);
            if let Some(body) = &call.body {
                request = request.json(body)?;
            }
            let batch: Vec<SalesforceResult> = self.client.execute_json(request).await?;
            if batch.len() != call.records {
                warn!(
                    batch = index,
                    sent = call.records,
                    returned = batch.len(),
                    "Result count does not match batch size"
                );
            }
            debug!(batch = index, records = call.records, "Collection batch written");
            results.extend(batch);
        }
        Ok(results)
    }
}
