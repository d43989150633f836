//! Types for Bulk API 2.0.

use bytes::Bytes;
use forcepipe_client::SalesforceResults;
use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize API version that can be either a float (59.0) or string ("59.0").
pub(crate) fn deserialize_api_version<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ApiVersion {
        Float(f64),
        String(String),
    }

    Option::<ApiVersion>::deserialize(deserializer).map(|opt| {
        opt.map(|v| match v {
            ApiVersion::Float(f) => format!("{:.1}", f),
            ApiVersion::String(s) => s,
        })
    })
}

/// Bulk API 2.0 job states.
///
/// Transitions only move forward:
/// `Open -> UploadComplete -> InProgress -> {JobComplete | Aborted | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Job is open and accepting data
    Open,
    /// Upload is complete, job is ready for processing
    UploadComplete,
    /// Job is processing
    InProgress,
    /// Job was aborted
    Aborted,
    /// Job completed successfully
    JobComplete,
    /// Job failed
    Failed,
}

impl JobState {
    /// Check if job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Aborted | JobState::JobComplete | JobState::Failed
        )
    }

    /// Only `JobComplete` has results worth fetching.
    pub fn is_success(&self) -> bool {
        matches!(self, JobState::JobComplete)
    }
}

/// Bulk API 2.0 operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkOperation {
    Insert,
    Update,
    /// Matches existing records on an external id field.
    Upsert,
    Delete,
    Query,
}

impl BulkOperation {
    pub fn api_name(&self) -> &'static str {
        match self {
            BulkOperation::Insert => "insert",
            BulkOperation::Update => "update",
            BulkOperation::Upsert => "upsert",
            BulkOperation::Delete => "delete",
            BulkOperation::Query => "query",
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, BulkOperation::Query)
    }

    /// Whether uploaded rows must carry a record `Id`.
    pub(crate) fn requires_id(&self) -> bool {
        matches!(self, BulkOperation::Update | BulkOperation::Delete)
    }
}

/// Which job family an id belongs to; the two live under different paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    Ingest,
    Query,
}

impl JobType {
    pub(crate) fn path(&self) -> &'static str {
        match self {
            JobType::Ingest => "ingest",
            JobType::Query => "query",
        }
    }
}

/// Content type for Bulk API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ContentType {
    #[default]
    #[serde(rename = "CSV")]
    Csv,
}

/// Line ending style for Bulk API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LineEnding {
    /// Unix-style (LF)
    #[default]
    #[serde(rename = "LF")]
    Lf,
    /// Windows-style (CRLF)
    #[serde(rename = "CRLF")]
    Crlf,
}

/// Column delimiter for Bulk API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ColumnDelimiter {
    #[default]
    #[serde(rename = "COMMA")]
    Comma,
    #[serde(rename = "TAB")]
    Tab,
    #[serde(rename = "SEMICOLON")]
    Semicolon,
    #[serde(rename = "PIPE")]
    Pipe,
    #[serde(rename = "BACKQUOTE")]
    Backquote,
    #[serde(rename = "CARET")]
    Caret,
}

impl ColumnDelimiter {
    /// The delimiter byte handed to the CSV reader and writer.
    pub fn byte(&self) -> u8 {
        match self {
            ColumnDelimiter::Comma => b',',
            ColumnDelimiter::Tab => b'\t',
            ColumnDelimiter::Semicolon => b';',
            ColumnDelimiter::Pipe => b'|',
            ColumnDelimiter::Backquote => b'`',
            ColumnDelimiter::Caret => b'^',
        }
    }
}

/// Objects that accept an assignment rule on ingest.
const ASSIGNMENT_RULE_OBJECTS: [&str; 2] = ["Lead", "Case"];

/// Assignment rules only apply to Leads and Cases.
pub fn supports_assignment_rule(sobject: &str) -> bool {
    ASSIGNMENT_RULE_OBJECTS
        .iter()
        .any(|name| name.eq_ignore_ascii_case(sobject))
}

// =============================================================================
// Request Types
// =============================================================================

/// Request to create an ingest job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIngestJobRequest {
    pub object: String,
    pub operation: BulkOperation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id_field_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_rule_id: Option<String>,
    pub content_type: ContentType,
    pub column_delimiter: ColumnDelimiter,
    pub line_ending: LineEnding,
}

impl CreateIngestJobRequest {
    pub fn new(sobject: impl Into<String>, operation: BulkOperation) -> Self {
        Self {
            object: sobject.into(),
            operation,
            external_id_field_name: None,
            assignment_rule_id: None,
            content_type: ContentType::Csv,
            column_delimiter: ColumnDelimiter::default(),
            line_ending: LineEnding::default(),
        }
    }

    /// Set the external ID field for upsert operations.
    pub fn with_external_id_field(mut self, field: impl Into<String>) -> Self {
        self.external_id_field_name = Some(field.into());
        self
    }

    /// Route created or updated Leads/Cases through an assignment rule.
    pub fn with_assignment_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.assignment_rule_id = Some(rule_id.into());
        self
    }

    pub fn with_column_delimiter(mut self, delimiter: ColumnDelimiter) -> Self {
        self.column_delimiter = delimiter;
        self
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }
}

/// Request to create a query job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQueryJobRequest {
    pub query: String,
    pub operation: BulkOperation,
    pub column_delimiter: ColumnDelimiter,
    pub line_ending: LineEnding,
}

impl CreateQueryJobRequest {
    pub fn new(soql: impl Into<String>) -> Self {
        Self {
            query: soql.into(),
            operation: BulkOperation::Query,
            column_delimiter: ColumnDelimiter::default(),
            line_ending: LineEnding::default(),
        }
    }

    pub fn with_column_delimiter(mut self, delimiter: ColumnDelimiter) -> Self {
        self.column_delimiter = delimiter;
        self
    }
}

/// Body of the PATCH that moves a job along.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct UpdateJobStateRequest {
    pub state: JobState,
}

// =============================================================================
// Response Types
// =============================================================================

/// Job descriptor returned by create, close, abort and status calls.
///
/// Each poll replaces the whole snapshot, so `state` and the counters
/// always reflect the server's latest answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub state: JobState,
    /// Operation name as the server reports it.
    pub operation: String,
    /// Absent on query jobs.
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub external_id_field_name: Option<String>,
    #[serde(default)]
    pub assignment_rule_id: Option<String>,
    #[serde(default)]
    pub column_delimiter: Option<ColumnDelimiter>,
    #[serde(default)]
    pub line_ending: Option<LineEnding>,
    #[serde(default)]
    pub number_records_processed: u64,
    #[serde(default)]
    pub number_records_failed: u64,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub system_modstamp: Option<String>,
    /// Total processing time in milliseconds
    #[serde(default)]
    pub total_processing_time: Option<u64>,
    /// API version (can be float like 59.0 or string like "59.0")
    #[serde(default, deserialize_with = "deserialize_api_version")]
    pub api_version: Option<String>,
    #[serde(default)]
    pub concurrency_mode: Option<String>,
    /// Server explanation for `Failed` and `Aborted` jobs.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Job {
    pub fn delimiter(&self) -> ColumnDelimiter {
        self.column_delimiter.unwrap_or_default()
    }
}

// =============================================================================
// Pipeline Types
// =============================================================================

/// How far a bulk ingest call drives the job before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Wait {
    /// Return once the job is closed.
    #[default]
    None,
    /// Poll until the job reaches a terminal state.
    Completion,
    /// Poll to completion, then fetch per-record outcomes.
    Results,
}

impl Wait {
    pub(crate) fn polls(&self) -> bool {
        !matches!(self, Wait::None)
    }
}

impl From<bool> for Wait {
    fn from(wait: bool) -> Self {
        if wait {
            Wait::Completion
        } else {
            Wait::None
        }
    }
}

/// What a bulk ingest call hands back.
#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    /// Ids of the jobs created by this call.
    pub job_ids: Vec<String>,
    /// Terminal snapshot, when the call waited.
    pub job: Option<Job>,
    /// Per-record outcomes, successes first then failures, when requested.
    pub results: Option<SalesforceResults>,
}

impl BulkOutcome {
    /// Returns true if any record failed, either per the job counters or the fetched results.
    pub fn has_errors(&self) -> bool {
        self.results.as_ref().is_some_and(SalesforceResults::has_errors)
            || self.job.as_ref().is_some_and(|job| job.number_records_failed > 0)
    }
}

/// One fetched page of results.
#[derive(Debug, Clone)]
pub struct ResultPage {
    /// Locator for the following page; `None` on the last page.
    pub locator: Option<String>,
    /// Value of `Sforce-NumberOfRecords`, when sent.
    pub number_of_records: Option<u64>,
    /// Raw CSV, header row included.
    pub body: Bytes,
}

impl ResultPage {
    pub fn is_last(&self) -> bool {
        self.locator.is_none()
    }
}
