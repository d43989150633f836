use tracing::{debug, instrument};

use forcepipe_client::{Record, SalesforceResults};

use crate::composite::{CompositeRequest, CompositeResponse, CompositeSubrequest, MAX_SUBREQUESTS};
use crate::error::{Error, ErrorKind, Result};

use super::{BatchCall, SalesforceRestClient, Write};

impl SalesforceRestClient {
    /// Create records through the Composite API.
    ///
    /// Each batch becomes a collections subrequest and up to 25 subrequests
    /// travel in one `/composite` call. With `all_or_none` set, a failure
    /// rolls back every subrequest of that call.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn insert_composite<R: Record>(
        &self,
        sobject: &str,
        records: &[R],
        batch_size: usize,
        all_or_none: bool,
    ) -> Result<SalesforceResults> {
        let calls = self.plan(Write::Insert, sobject, records, batch_size, all_or_none)?;
        self.run_composite(calls, all_or_none).await
    }

    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn update_composite<R: Record>(
        &self,
        sobject: &str,
        records: &[R],
        batch_size: usize,
        all_or_none: bool,
    ) -> Result<SalesforceResults> {
        let calls = self.plan(Write::Update, sobject, records, batch_size, all_or_none)?;
        self.run_composite(calls, all_or_none).await
    }

    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn upsert_composite<R: Record>(
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
        self.run_composite(calls, all_or_none).await
    }

    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn delete_composite<R: Record>(
        &self,
        sobject: &str,
        records: &[R],
        batch_size: usize,
        all_or_none: bool,
    ) -> Result<SalesforceResults> {
        let calls = self.plan(Write::Delete, sobject, records, batch_size, all_or_none)?;
        self.run_composite(calls, all_or_none).await
    }

    async fn run_composite(
        &self,
        calls: Vec<BatchCall>,
        all_or_none: bool,
    ) -> Result<SalesforceResults> {
        let url = self.client.rest_url("composite");
        let mut results = SalesforceResults::new();

        for (call_index, chunk) in calls.chunks(MAX_SUBREQUESTS).enumerate() {
            let request = CompositeRequest {
                all_or_none,
                collate_subrequests: false,
                subrequests: chunk
                    .iter()
                    .enumerate()
                    .map(|(i, call)| CompositeSubrequest {
                        method: call.method.as_str().to_string(),
                        url: format!("/services/data/v{}/{}", self.client.api_version(), call.path),
                        reference_id: reference_id(call_index * MAX_SUBREQUESTS + i),
                        body: call.body.clone(),
                    })
                    .collect(),
            };

            let response: CompositeResponse = self.client.post_json(&url, &request).await?;
            if response.responses.len() != chunk.len() {
                return Err(Error::new(ErrorKind::Client(format!(
                    "composite call {call_index} answered {} of {} subrequests",
                    response.responses.len(),
                    chunk.len()
                ))));
            }

            for (subrequest, (call, sub)) in request
                .subrequests
                .iter()
                .zip(chunk.iter().zip(response.responses))
            {
                if sub.reference_id != subrequest.reference_id {
                    return Err(Error::new(ErrorKind::Client(format!(
                        "expected subresponse {}, got {}",
                        subrequest.reference_id, sub.reference_id
                    ))));
                }
                results.extend(sub.into_results(call.records)?);
            }
            debug!(call = call_index, subrequests = chunk.len(), "Composite call complete");
        }
        Ok(results)
    }
}

fn reference_id(batch: usize) -> String {
    format!("batch{batch}")
}
