//! Job lifecycle: create, upload, close, abort, status and polling.

use std::time::Duration;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use forcepipe_client::security;

use crate::error::{Error, ErrorKind, Result, Stage};
use crate::types::{
    supports_assignment_rule, BulkOperation, CreateIngestJobRequest, CreateQueryJobRequest, Job,
    JobState, JobType, ResultPage, UpdateJobStateRequest,
};

use super::BulkApiClient;

/// Check an ingest request before anything touches the network.
pub(crate) fn validate_ingest_request(request: &CreateIngestJobRequest) -> Result<()> {
    security::require_sobject_name(&request.object)?;

    if request.operation.is_query() {
        return Err(Error::validation("query is not an ingest operation"));
    }

    if let Some(rule_id) = &request.assignment_rule_id {
        if !supports_assignment_rule(&request.object) {
            return Err(Error::validation(format!(
                "assignment rules are not supported for {}; only Lead and Case accept them",
                request.object
            )));
        }
        if rule_id.trim().is_empty() {
            return Err(Error::validation("assignment rule id is empty"));
        }
    }

    match (&request.operation, &request.external_id_field_name) {
        (BulkOperation::Upsert, None) => {
            Err(Error::validation("upsert requires an external id field"))
        }
        (BulkOperation::Upsert, Some(field)) => {
            security::require_field_name(field)?;
            Ok(())
        }
        (_, Some(_)) => Err(Error::validation("an external id field only applies to upsert")),
        (_, None) => Ok(()),
    }
}

/// Turn an `Aborted` or `Failed` snapshot into an error carrying the server message.
pub(crate) fn require_complete(job: Job) -> Result<Job> {
    match job.state {
        JobState::JobComplete => Ok(job),
        state => Err(Error::new(ErrorKind::JobFailed {
            message: job
                .error_message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "no error message reported".to_string()),
            job_id: job.id,
            state,
        })),
    }
}

impl BulkApiClient {
    /// Create an ingest job in state `Open`.
    ///
    /// Fails with a validation error, before any request, when an assignment
    /// rule targets an object other than Lead or Case, or when an upsert has
    /// no external id field.
    #[instrument(
        skip(self, cancel, request),
        fields(object = %request.object, operation = ?request.operation)
    )]
    pub async fn create_ingest_job(
        &self,
        cancel: &CancellationToken,
        request: CreateIngestJobRequest,
    ) -> Result<Job> {
        validate_ingest_request(&request)?;

        let url = self.client.bulk_url("ingest");
        let req = self.client.post(&url).json(&request)?;
        let job: Job = self.send_json(Stage::CreateJob, cancel, req).await?;

        info!(job_id = %job.id, state = ?job.state, "Created ingest job");
        Ok(job)
    }

    /// Create a query job.
    #[instrument(skip(self, cancel, request))]
    pub async fn create_query_job(
        &self,
        cancel: &CancellationToken,
        request: CreateQueryJobRequest,
    ) -> Result<Job> {
        if request.query.trim().is_empty() {
            return Err(Error::validation("query is empty"));
        }

        let url = self.client.bulk_url("query");
        let req = self.client.post(&url).json(&request)?;
        let job: Job = self.send_json(Stage::CreateJob, cancel, req).await?;

        info!(job_id = %job.id, "Created query job");
        Ok(job)
    }

    /// Upload one CSV batch to an `Open` ingest job.
    ///
    /// Any non-2xx answer is returned as a remote error for [`Stage::Upload`];
    /// the upload is not retried.
    #[instrument(skip(self, cancel, body))]
    pub async fn upload_batch(
        &self,
        cancel: &CancellationToken,
        job_id: &str,
        body: impl Into<Bytes>,
    ) -> Result<()> {
        let body = body.into();
        let url = format!("{}/batches", self.job_url(JobType::Ingest, job_id));
        let size = body.len();

        self.send(Stage::Upload, cancel, self.client.put(&url).csv_bytes(body))
            .await?;

        debug!(bytes = size, "Uploaded batch");
        Ok(())
    }

    /// Mark an ingest job `UploadComplete` so the server starts processing.
    ///
    /// A second close may be rejected by the server; pipelines call this
    /// exactly once per job.
    #[instrument(skip(self, cancel))]
    pub async fn close_job(&self, cancel: &CancellationToken, job_id: &str) -> Result<Job> {
        let url = self.job_url(JobType::Ingest, job_id);
        let req = self.client.patch(&url).json(&UpdateJobStateRequest {
            state: JobState::UploadComplete,
        })?;
        let job: Job = self.send_json(Stage::Close, cancel, req).await?;

        info!(state = ?job.state, "Closed job");
        Ok(job)
    }

    /// Abort a job that has not finished.
    #[instrument(skip(self, cancel))]
    pub async fn abort_job(
        &self,
        cancel: &CancellationToken,
        job_type: JobType,
        job_id: &str,
    ) -> Result<Job> {
        let url = self.job_url(job_type, job_id);
        let req = self.client.patch(&url).json(&UpdateJobStateRequest {
            state: JobState::Aborted,
        })?;
        let job: Job = self.send_json(Stage::Abort, cancel, req).await?;

        info!(state = ?job.state, "Aborted job");
        Ok(job)
    }

    /// Abort a job whose upload or close failed, so it is not left `Open`.
    /// Failures are logged, not returned, and the abort runs even if the
    /// pipeline's token was cancelled.
    pub(crate) async fn abandon(&self, job_id: &str) {
        if let Err(err) = self
            .abort_job(&CancellationToken::new(), JobType::Ingest, job_id)
            .await
        {
            warn!(job_id, error = %err, "Could not abort unfinished job");
        }
    }

    /// Fetch the current job snapshot.
    #[instrument(skip(self, cancel))]
    pub async fn get_job(
        &self,
        cancel: &CancellationToken,
        job_type: JobType,
        job_id: &str,
    ) -> Result<Job> {
        let url = self.job_url(job_type, job_id);
        self.send_json(Stage::Poll, cancel, self.client.get(&url)).await
    }

    /// Current status and counters of an ingest job.
    pub async fn get_job_results(&self, cancel: &CancellationToken, job_id: &str) -> Result<Job> {
        self.get_job(cancel, JobType::Ingest, job_id).await
    }

    /// Poll every `interval` until the job is `JobComplete`, `Aborted` or
    /// `Failed`, and return that snapshot.
    ///
    /// The token is checked before every request, raced against the request
    /// itself, checked again before sleeping and raced against the sleep, so
    /// a cancellation is observed within one interval. A failed status
    /// request ends the loop.
    #[instrument(skip(self, cancel))]
    pub async fn poll_until_terminal(
        &self,
        cancel: &CancellationToken,
        job_type: JobType,
        job_id: &str,
        interval: Duration,
    ) -> Result<Job> {
        let mut polls = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(Error::cancelled(Stage::Poll));
            }

            let job = self.get_job(cancel, job_type, job_id).await?;
            polls += 1;
            debug!(
                polls,
                state = ?job.state,
                processed = job.number_records_processed,
                failed = job.number_records_failed,
                "Polled job"
            );

            if job.state.is_terminal() {
                if job.state.is_success() {
                    info!(polls, processed = job.number_records_processed, "Job complete");
                } else {
                    warn!(state = ?job.state, message = ?job.error_message, "Job did not complete");
                }
                return Ok(job);
            }

            if cancel.is_cancelled() {
                return Err(Error::cancelled(Stage::Poll));
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::cancelled(Stage::Poll)),
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// Fetch one result page. `url` is the results resource of the job.
    pub(crate) async fn fetch_page(
        &self,
        cancel: &CancellationToken,
        url: &str,
        locator: Option<&str>,
        max_records: Option<u64>,
    ) -> Result<ResultPage> {
        let mut req = self.client.get(url).header("Accept", "text/csv");
        if let Some(locator) = locator {
            req = req.query("locator", locator);
        }
        if let Some(max) = max_records {
            req = req.query("maxRecords", max.to_string());
        }

        let response = self.send(Stage::FetchResults, cancel, req).await?;
        let locator = response.next_locator();
        let number_of_records = response.sforce_number_of_records();
        let body = response
            .bytes()
            .await
            .map_err(|err| Error::at(Stage::FetchResults, err))?;

        debug!(
            bytes = body.len(),
            records = ?number_of_records,
            last = locator.is_none(),
            "Fetched result page"
        );
        Ok(ResultPage {
            locator,
            number_of_records,
            body,
        })
    }
}
