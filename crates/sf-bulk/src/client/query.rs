//! Query jobs: paged iteration and export to a file.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use forcepipe_client::security;

use crate::codec;
use crate::error::Result;
use crate::iterator::{ResultIterator, ResultSource};
use crate::types::CreateQueryJobRequest;

use super::BulkApiClient;

/// What an export wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub job_id: String,
    pub path: PathBuf,
    pub pages: usize,
    /// Sum of `Sforce-NumberOfRecords` over all pages.
    pub records: u64,
}

impl BulkApiClient {
    /// Start a query job and return a cursor over its result pages.
    ///
    /// The job is created here; the first [`ResultIterator::advance`] waits
    /// for it to complete.
    #[instrument(skip(self, cancel))]
    pub async fn query_bulk_iterator(
        &self,
        cancel: &CancellationToken,
        soql: &str,
    ) -> Result<ResultIterator> {
        let job = self
            .create_query_job(cancel, CreateQueryJobRequest::new(soql))
            .await?;
        Ok(ResultIterator::new(self.clone(), job.id, ResultSource::Query))
    }

    /// Run a query and stream every result page into `path` as one CSV
    /// document with a single header row.
    ///
    /// Pages go to `<path>.part` first, which is renamed to `path` once the
    /// last page is written. On failure or cancellation the partial file is
    /// flushed, closed and left in place.
    #[instrument(skip(self, cancel, path), fields(path = %path.as_ref().display()))]
    pub async fn query_bulk_export(
        &self,
        cancel: &CancellationToken,
        soql: &str,
        path: impl AsRef<Path>,
    ) -> Result<ExportSummary> {
        let path = path.as_ref();
        let pages = self.query_bulk_iterator(cancel, soql).await?;
        self.export_pages(cancel, pages, path).await
    }

    /// Export `fields` of every `sobject` record, building the SELECT from
    /// checked names.
    pub async fn query_bulk_export_fields(
        &self,
        cancel: &CancellationToken,
        sobject: &str,
        fields: &[&str],
        path: impl AsRef<Path>,
    ) -> Result<ExportSummary> {
        let soql = security::select_statement(sobject, fields)?;
        self.query_bulk_export(cancel, &soql, path).await
    }

    async fn export_pages(
        &self,
        cancel: &CancellationToken,
        mut pages: ResultIterator,
        path: &Path,
    ) -> Result<ExportSummary> {
        let staging = part_path(path);
        if let Some(parent) = staging.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = BufWriter::new(tokio::fs::File::create(&staging).await?);

        let mut records = 0u64;
        let mut written: Result<()> = Ok(());
        while pages.advance(cancel).await {
            let Some(page) = pages.current_page() else { break };
            let chunk = if pages.pages_fetched() == 1 {
                &page.body[..]
            } else {
                codec::strip_header(&page.body)
            };
            records += page.number_of_records.unwrap_or(0);
            if let Err(err) = file.write_all(chunk).await {
                written = Err(err.into());
                break;
            }
        }

        // Flush and close on every path, including early termination.
        let flushed = file.flush().await;
        drop(file);

        if let Some(err) = pages.take_error() {
            warn!(part = %staging.display(), error = %err, "Export stopped early");
            return Err(err);
        }
        written?;
        flushed?;

        tokio::fs::rename(&staging, path).await?;
        info!(job_id = %pages.job_id(), pages = pages.pages_fetched(), records, "Export complete");

        Ok(ExportSummary {
            job_id: pages.job_id().to_string(),
            path: path.to_path_buf(),
            pages: pages.pages_fetched(),
            records,
        })
    }
}

/// `accounts.csv` stages in `accounts.csv.part`.
fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
