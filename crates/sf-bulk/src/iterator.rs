//! Locator-chained paging over a job's results.
//!
//! A [`ResultIterator`] yields raw pages, one at a time. Decoding a page into
//! records is a separate step ([`ResultIterator::decode_current`]), so at most
//! one page is held in memory however large the result set is.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::{require_complete, BulkApiClient};
use crate::codec;
use crate::error::{Error, Result};
use crate::types::{ColumnDelimiter, Job, JobType, ResultPage};

/// Which results resource of a job to page through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    /// `/jobs/query/{id}/results`
    Query,
    /// `/jobs/ingest/{id}/successfulResults`
    Successful,
    /// `/jobs/ingest/{id}/failedResults`
    Failed,
}

impl ResultSource {
    pub fn job_type(&self) -> JobType {
        match self {
            ResultSource::Query => JobType::Query,
            ResultSource::Successful | ResultSource::Failed => JobType::Ingest,
        }
    }

    fn resource(&self) -> &'static str {
        match self {
            ResultSource::Query => "results",
            ResultSource::Successful => "successfulResults",
            ResultSource::Failed => "failedResults",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CursorState {
    /// No page fetched yet.
    NotStarted,
    /// The last page fetched named this locator for the next one.
    Active(String),
    /// The last page has been fetched, or a fetch failed.
    Exhausted,
}

/// Single-pass cursor over one job's result pages.
///
/// ```rust,ignore
/// let mut pages = client.query_bulk_iterator(&cancel, "SELECT Id, Name FROM Account").await?;
/// while pages.advance(&cancel).await {
///     let accounts: Vec<Account> = pages.decode_current()?;
///     // ...
/// }
/// if let Some(err) = pages.take_error() {
///     return Err(err);
/// }
/// ```
#[derive(Debug)]
pub struct ResultIterator {
    client: BulkApiClient,
    job_id: String,
    source: ResultSource,
    max_records: Option<u64>,
    poll_interval: Duration,
    state: CursorState,
    /// Terminal `JobComplete` snapshot, once confirmed.
    job: Option<Job>,
    current: Option<ResultPage>,
    error: Option<Error>,
    pages_fetched: usize,
}

impl ResultIterator {
    /// Page through `source` of `job_id`. The first [`advance`](Self::advance)
    /// waits for the job to reach `JobComplete`.
    pub fn new(client: BulkApiClient, job_id: impl Into<String>, source: ResultSource) -> Self {
        let poll_interval = client.poll_interval();
        Self {
            client,
            job_id: job_id.into(),
            source,
            max_records: None,
            poll_interval,
            state: CursorState::NotStarted,
            job: None,
            current: None,
            error: None,
            pages_fetched: 0,
        }
    }

    /// Iterate results of a job already known to be `JobComplete`.
    pub(crate) fn for_completed(client: BulkApiClient, job: &Job, source: ResultSource) -> Self {
        let mut iter = Self::new(client, job.id.clone(), source);
        iter.job = Some(job.clone());
        iter
    }

    /// Ask the server for at most `max` rows per page.
    pub fn with_max_records(mut self, max: u64) -> Self {
        self.max_records = Some(max);
        self
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// The `JobComplete` snapshot, once the first advance has confirmed it.
    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    fn delimiter(&self) -> ColumnDelimiter {
        self.job.as_ref().map(Job::delimiter).unwrap_or_default()
    }

    fn fail(&mut self, err: Error) -> bool {
        warn!(job_id = %self.job_id, error = %err, "Result iteration stopped");
        self.state = CursorState::Exhausted;
        self.current = None;
        self.error = Some(err);
        false
    }

    /// Fetch the next page.
    ///
    /// Returns `true` when a page (possibly empty) was fetched, `false` when
    /// the previous page was the last one or a fetch failed. Use
    /// [`error`](Self::error) to tell the two apart.
    pub async fn advance(&mut self, cancel: &CancellationToken) -> bool {
        let locator = match &self.state {
            CursorState::Exhausted => return false,
            CursorState::NotStarted => None,
            CursorState::Active(locator) => Some(locator.clone()),
        };

        if self.job.is_none() {
            let confirmed = self
                .client
                .poll_until_terminal(
                    cancel,
                    self.source.job_type(),
                    &self.job_id,
                    self.poll_interval,
                )
                .await
                .and_then(require_complete);
            match confirmed {
                Ok(job) => self.job = Some(job),
                Err(err) => return self.fail(err),
            }
        }

        let url = format!(
            "{}/{}",
            self.client.job_url(self.source.job_type(), &self.job_id),
            self.source.resource()
        );
        // Release the previous page before fetching the next.
        self.current = None;
        match self
            .client
            .fetch_page(cancel, &url, locator.as_deref(), self.max_records)
            .await
        {
            Ok(page) => {
                self.pages_fetched += 1;
                self.state = match &page.locator {
                    Some(next) => CursorState::Active(next.clone()),
                    None => CursorState::Exhausted,
                };
                debug!(job_id = %self.job_id, page = self.pages_fetched, "Advanced result cursor");
                self.current = Some(page);
                true
            }
            Err(err) => self.fail(err),
        }
    }

    /// Why iteration stopped early, if it did.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    /// The page fetched by the last successful advance.
    pub fn current_page(&self) -> Option<&ResultPage> {
        self.current.as_ref()
    }

    /// Decode the current page into records.
    ///
    /// Calling this before a successful [`advance`](Self::advance) is a
    /// validation error. A header-only page decodes to an empty vector.
    pub fn decode_current<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let page = self.current.as_ref().ok_or_else(|| {
            Error::validation("decode_current called before a successful advance")
        })?;
        codec::decode_records(&page.body, self.delimiter())
    }

    /// Advance and decode in one step; `Ok(None)` at the clean end.
    pub async fn next_records<T: DeserializeOwned>(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<T>>> {
        if self.advance(cancel).await {
            return self.decode_current().map(Some);
        }
        match self.take_error() {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }

    /// `Sforce-NumberOfRecords` of the current page.
    pub fn number_of_records(&self) -> Option<u64> {
        self.current.as_ref().and_then(|page| page.number_of_records)
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// True once the last page has been fetched or a fetch failed.
    pub fn is_exhausted(&self) -> bool {
        self.state == CursorState::Exhausted
    }
}
