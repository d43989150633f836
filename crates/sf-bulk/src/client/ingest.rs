//! Ingest pipelines: validate, partition, encode, then one job with
//! sequential uploads and a single close.

use std::path::Path;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use forcepipe_client::{
    partition_records, require_field, validate_batch_size, BatchLimit, Fields, Record,
    SalesforceResults,
};

use crate::codec::{self, ResultKind, ID_FIELD};
use crate::error::{Error, ErrorKind, Result};
use crate::iterator::{ResultIterator, ResultSource};
use crate::types::{BulkOperation, BulkOutcome, CreateIngestJobRequest, Job, JobType, Wait};

use super::job::validate_ingest_request;
use super::{require_complete, BulkApiClient};

fn ingest_request(
    sobject: &str,
    operation: BulkOperation,
    external_id_field: Option<&str>,
    assignment_rule_id: Option<&str>,
) -> CreateIngestJobRequest {
    let mut request = CreateIngestJobRequest::new(sobject, operation);
    if let Some(field) = external_id_field {
        request = request.with_external_id_field(field);
    }
    if let Some(rule_id) = assignment_rule_id {
        request = request.with_assignment_rule(rule_id);
    }
    request
}

/// Field every row must carry a value for, if any.
fn required_column(request: &CreateIngestJobRequest) -> Option<&str> {
    if request.operation.requires_id() {
        Some(ID_FIELD)
    } else {
        request.external_id_field_name.as_deref()
    }
}

/// Every batch is checked for uniform fields when encoded; this checks the
/// batches agree with each other.
fn ensure_same_columns(batches: &[Vec<Fields>]) -> Result<()> {
    let Some(first) = batches.first().and_then(|batch| batch.first()) else {
        return Ok(());
    };
    for (index, batch) in batches.iter().enumerate().skip(1) {
        let Some(lead) = batch.first() else { continue };
        if lead.len() != first.len() || lead.keys().any(|key| !first.contains_key(key)) {
            return Err(Error::validation(format!(
                "batch {index} has different fields than the first record"
            )));
        }
    }
    Ok(())
}

impl BulkApiClient {
    /// Bulk insert records.
    pub async fn insert_bulk<R: Record>(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        records: &[R],
        batch_size: usize,
        wait: impl Into<Wait>,
    ) -> Result<BulkOutcome> {
        let request = ingest_request(sobject, BulkOperation::Insert, None, None);
        self.ingest_records(cancel, request, records, batch_size, wait.into()).await
    }

    /// Bulk insert Leads or Cases through an assignment rule.
    pub async fn insert_bulk_assign<R: Record>(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        records: &[R],
        batch_size: usize,
        wait: impl Into<Wait>,
        assignment_rule_id: &str,
    ) -> Result<BulkOutcome> {
        let request =
            ingest_request(sobject, BulkOperation::Insert, None, Some(assignment_rule_id));
        self.ingest_records(cancel, request, records, batch_size, wait.into()).await
    }

    /// Bulk update records. Every record needs an `Id`.
    pub async fn update_bulk<R: Record>(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        records: &[R],
        batch_size: usize,
        wait: impl Into<Wait>,
    ) -> Result<BulkOutcome> {
        let request = ingest_request(sobject, BulkOperation::Update, None, None);
        self.ingest_records(cancel, request, records, batch_size, wait.into()).await
    }

    pub async fn update_bulk_assign<R: Record>(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        records: &[R],
        batch_size: usize,
        wait: impl Into<Wait>,
        assignment_rule_id: &str,
    ) -> Result<BulkOutcome> {
        let request =
            ingest_request(sobject, BulkOperation::Update, None, Some(assignment_rule_id));
        self.ingest_records(cancel, request, records, batch_size, wait.into()).await
    }

    /// Bulk upsert records matched on `external_id_field`, which every
    /// record must carry.
    pub async fn upsert_bulk<R: Record>(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        external_id_field: &str,
        records: &[R],
        batch_size: usize,
        wait: impl Into<Wait>,
    ) -> Result<BulkOutcome> {
        let request = ingest_request(sobject, BulkOperation::Upsert, Some(external_id_field), None);
        self.ingest_records(cancel, request, records, batch_size, wait.into()).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_bulk_assign<R: Record>(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        external_id_field: &str,
        records: &[R],
        batch_size: usize,
        wait: impl Into<Wait>,
        assignment_rule_id: &str,
    ) -> Result<BulkOutcome> {
        let request = ingest_request(
            sobject,
            BulkOperation::Upsert,
            Some(external_id_field),
            Some(assignment_rule_id),
        );
        self.ingest_records(cancel, request, records, batch_size, wait.into()).await
    }

    /// Bulk delete records. Only the `Id` column is uploaded.
    pub async fn delete_bulk<R: Record>(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        records: &[R],
        batch_size: usize,
        wait: impl Into<Wait>,
    ) -> Result<BulkOutcome> {
        let request = ingest_request(sobject, BulkOperation::Delete, None, None);
        self.ingest_records(cancel, request, records, batch_size, wait.into()).await
    }

    /// Bulk insert from a CSV file with a header row.
    pub async fn insert_bulk_file(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        path: impl AsRef<Path>,
        batch_size: usize,
        wait: impl Into<Wait>,
    ) -> Result<BulkOutcome> {
        let request = ingest_request(sobject, BulkOperation::Insert, None, None);
        self.ingest_file(cancel, request, path.as_ref(), batch_size, wait.into()).await
    }

    pub async fn insert_bulk_file_assign(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        path: impl AsRef<Path>,
        batch_size: usize,
        wait: impl Into<Wait>,
        assignment_rule_id: &str,
    ) -> Result<BulkOutcome> {
        let request =
            ingest_request(sobject, BulkOperation::Insert, None, Some(assignment_rule_id));
        self.ingest_file(cancel, request, path.as_ref(), batch_size, wait.into()).await
    }

    pub async fn update_bulk_file(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        path: impl AsRef<Path>,
        batch_size: usize,
        wait: impl Into<Wait>,
    ) -> Result<BulkOutcome> {
        let request = ingest_request(sobject, BulkOperation::Update, None, None);
        self.ingest_file(cancel, request, path.as_ref(), batch_size, wait.into()).await
    }

    pub async fn update_bulk_file_assign(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        path: impl AsRef<Path>,
        batch_size: usize,
        wait: impl Into<Wait>,
        assignment_rule_id: &str,
    ) -> Result<BulkOutcome> {
        let request =
            ingest_request(sobject, BulkOperation::Update, None, Some(assignment_rule_id));
        self.ingest_file(cancel, request, path.as_ref(), batch_size, wait.into()).await
    }

    pub async fn upsert_bulk_file(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        external_id_field: &str,
        path: impl AsRef<Path>,
        batch_size: usize,
        wait: impl Into<Wait>,
    ) -> Result<BulkOutcome> {
        let request = ingest_request(sobject, BulkOperation::Upsert, Some(external_id_field), None);
        self.ingest_file(cancel, request, path.as_ref(), batch_size, wait.into()).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_bulk_file_assign(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        external_id_field: &str,
        path: impl AsRef<Path>,
        batch_size: usize,
        wait: impl Into<Wait>,
        assignment_rule_id: &str,
    ) -> Result<BulkOutcome> {
        let request = ingest_request(
            sobject,
            BulkOperation::Upsert,
            Some(external_id_field),
            Some(assignment_rule_id),
        );
        self.ingest_file(cancel, request, path.as_ref(), batch_size, wait.into()).await
    }

    /// Bulk delete from a CSV file that has an `Id` column.
    pub async fn delete_bulk_file(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        path: impl AsRef<Path>,
        batch_size: usize,
        wait: impl Into<Wait>,
    ) -> Result<BulkOutcome> {
        let request = ingest_request(sobject, BulkOperation::Delete, None, None);
        self.ingest_file(cancel, request, path.as_ref(), batch_size, wait.into()).await
    }

    /// Validate and encode in-memory records, then run the job.
    async fn ingest_records<R: Record>(
        &self,
        cancel: &CancellationToken,
        request: CreateIngestJobRequest,
        records: &[R],
        batch_size: usize,
        wait: Wait,
    ) -> Result<BulkOutcome> {
        validate_ingest_request(&request)?;
        let max = self.client.config().batch_max(BatchLimit::Bulk);
        validate_batch_size(batch_size, max)?;
        if records.is_empty() {
            return Err(Error::validation("no records to ingest"));
        }

        let batches = partition_records(records, batch_size, max)?;
        for batch in &batches {
            if let Some(column) = required_column(&request) {
                require_field(batch, column)?;
            }
        }

        let bodies = if request.operation == BulkOperation::Delete {
            batches
                .iter()
                .map(|batch| codec::encode_ids(batch, request.column_delimiter).map(Bytes::from))
                .collect::<Result<Vec<_>>>()?
        } else {
            ensure_same_columns(&batches)?;
            batches
                .iter()
                .map(|batch| {
                    codec::encode_records(batch, request.column_delimiter).map(Bytes::from)
                })
                .collect::<Result<Vec<_>>>()?
        };

        self.run_ingest_job(cancel, request, bodies, wait).await
    }

    /// Validate and split a CSV file, then run the job.
    async fn ingest_file(
        &self,
        cancel: &CancellationToken,
        request: CreateIngestJobRequest,
        path: &Path,
        batch_size: usize,
        wait: Wait,
    ) -> Result<BulkOutcome> {
        validate_ingest_request(&request)?;
        validate_batch_size(batch_size, self.client.config().batch_max(BatchLimit::Bulk))?;

        let data = tokio::fs::read(path).await?;
        let bodies = codec::split_csv(
            &data,
            batch_size,
            request.column_delimiter,
            required_column(&request),
        )
        .map_err(|err| {
            if let ErrorKind::Validation(message) = &err.kind {
                Error::validation(format!("{}: {message}", path.display()))
            } else {
                err
            }
        })?;
        if bodies.is_empty() {
            return Err(Error::validation(format!("{} has no data rows", path.display())));
        }
        drop(data);

        self.run_ingest_job(cancel, request, bodies, wait).await
    }

    /// Create one job, upload every body in order, close it once, then wait
    /// as far as `wait` asks.
    #[instrument(
        skip_all,
        fields(object = %request.object, operation = ?request.operation, batches = bodies.len())
    )]
    async fn run_ingest_job(
        &self,
        cancel: &CancellationToken,
        request: CreateIngestJobRequest,
        bodies: Vec<Bytes>,
        wait: Wait,
    ) -> Result<BulkOutcome> {
        let job = self.create_ingest_job(cancel, request).await?;
        let total = bodies.len();

        for (index, body) in bodies.into_iter().enumerate() {
            if let Err(err) = self.upload_batch(cancel, &job.id, body).await {
                self.abandon(&job.id).await;
                return Err(err);
            }
            debug!(batch = index + 1, total, "Batch accepted");
        }

        let closed = match self.close_job(cancel, &job.id).await {
            Ok(closed) => closed,
            Err(err) => {
                self.abandon(&job.id).await;
                return Err(err);
            }
        };
        let mut outcome = BulkOutcome {
            job_ids: vec![job.id.clone()],
            job: Some(closed),
            results: None,
        };
        if !wait.polls() {
            return Ok(outcome);
        }

        let finished = self
            .poll_until_terminal(cancel, JobType::Ingest, &job.id, self.poll_interval)
            .await?;
        let finished = require_complete(finished)?;
        info!(
            job_id = %finished.id,
            processed = finished.number_records_processed,
            failed = finished.number_records_failed,
            "Ingest finished"
        );

        if wait == Wait::Results {
            outcome.results = Some(self.ingest_results(cancel, &finished).await?);
        }
        outcome.job = Some(finished);
        Ok(outcome)
    }

    /// Per-record outcomes of a completed ingest job: successes in upload
    /// order, then failures.
    #[instrument(skip(self, cancel, job), fields(job_id = %job.id))]
    pub async fn ingest_results(
        &self,
        cancel: &CancellationToken,
        job: &Job,
    ) -> Result<SalesforceResults> {
        let mut results = SalesforceResults::new();
        for (source, kind) in [
            (ResultSource::Successful, ResultKind::Successful),
            (ResultSource::Failed, ResultKind::Failed),
        ] {
            let mut pages = ResultIterator::for_completed(self.clone(), job, source);
            while pages.advance(cancel).await {
                if let Some(page) = pages.current_page() {
                    let decoded = codec::decode_ingest_results(&page.body, job.delimiter(), kind)?;
                    results.extend(decoded);
                }
            }
            if let Some(err) = pages.take_error() {
                return Err(err);
            }
        }
        debug!(
            records = results.len(),
            has_errors = results.has_errors(),
            "Collected ingest results"
        );
        Ok(results)
    }
}
