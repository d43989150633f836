//! HTTP response handling with Salesforce-specific extensions.

use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use std::time::Duration;

use crate::error::{Error, ErrorKind, Result};

/// Value Salesforce sends in `Sforce-Locator` on the last result page.
pub const LOCATOR_END: &str = "null";

/// Wrapper around an HTTP response.
#[derive(Debug)]
pub struct Response {
    inner: reqwest::Response,
}

impl Response {
    pub(crate) fn new(inner: reqwest::Response) -> Self {
        Self { inner }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// Returns true if the response status is successful (2xx).
    pub fn is_success(&self) -> bool {
        self.inner.status().is_success()
    }

    /// Get a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name)?.to_str().ok()
    }

    /// Get the Retry-After header as a Duration (seconds form only).
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")?
            .trim()
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    }

    /// Raw `Sforce-Locator` header, exactly as sent.
    pub fn sforce_locator(&self) -> Option<&str> {
        self.header("sforce-locator")
    }

    /// Locator for the next result page.
    ///
    /// Absent, empty and the literal `"null"` all mean there is no next page.
    pub fn next_locator(&self) -> Option<String> {
        self.sforce_locator()
            .map(str::trim)
            .filter(|l| !l.is_empty() && *l != LOCATOR_END)
            .map(str::to_string)
    }

    /// `Sforce-NumberOfRecords` header: rows in this result page.
    pub fn sforce_number_of_records(&self) -> Option<u64> {
        self.header("sforce-numberofrecords")?.trim().parse().ok()
    }

    /// Get the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get the response body as text.
    pub async fn text(self) -> Result<String> {
        self.inner.text().await.map_err(Into::into)
    }

    /// Get the response body as bytes.
    pub async fn bytes(self) -> Result<bytes::Bytes> {
        self.inner.bytes().await.map_err(Into::into)
    }

    /// Deserialize the response body as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        self.inner.json().await.map_err(Into::into)
    }

    /// API usage reported in `Sforce-Limit-Info` (`api-usage=25/15000`).
    pub fn api_usage(&self) -> Option<ApiUsage> {
        let info = self.header("sforce-limit-info")?;
        info.split(',')
            .filter_map(|part| part.trim().strip_prefix("api-usage="))
            .find_map(|usage| {
                let (used, limit) = usage.split_once('/')?;
                Some(ApiUsage {
                    used: used.parse().ok()?,
                    limit: limit.parse().ok()?,
                })
            })
    }
}

/// API usage information from response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiUsage {
    /// Number of API calls used.
    pub used: u64,
    /// Total API call limit.
    pub limit: u64,
}

impl ApiUsage {
    /// Get the remaining API calls.
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }
}

/// Extension trait for processing Salesforce API responses.
pub trait ResponseExt {
    /// Turn a non-2xx response into the matching error kind.
    fn check_salesforce_error(self) -> impl std::future::Future<Output = Result<Response>> + Send;
}

impl ResponseExt for Response {
    async fn check_salesforce_error(self) -> Result<Response> {
        if self.is_success() {
            return Ok(self);
        }
        let status = self.status();
        let body = self.text().await.unwrap_or_default();
        Err(parse_error_response(status, &body))
    }
}

fn parse_error_response(status: u16, body: &str) -> Error {
    if status == 429 {
        return Error::new(ErrorKind::RateLimited { retry_after: None });
    }

    // Salesforce sends either an array of errors or a single object.
    let first = serde_json::from_str::<Vec<SalesforceErrorResponse>>(body)
        .ok()
        .and_then(|errors| errors.into_iter().next())
        .or_else(|| serde_json::from_str::<SalesforceErrorResponse>(body).ok());

    if let Some(err) = first {
        return Error::new(ErrorKind::SalesforceApi {
            status,
            error_code: err.error_code,
            message: sanitize_error_message(&err.message),
            fields: err.fields.unwrap_or_default(),
        });
    }

    let sanitized = sanitize_error_message(body);
    let kind = match status {
        401 => ErrorKind::Authentication(sanitized),
        403 => ErrorKind::Authorization(sanitized),
        404 => ErrorKind::NotFound(sanitized),
        412 => ErrorKind::PreconditionFailed(sanitized),
        _ => ErrorKind::Http {
            status,
            message: sanitized,
        },
    };
    Error::new(kind)
}

static TOKEN_PATTERN: LazyLock<Option<regex_lite::Regex>> =
    LazyLock::new(|| regex_lite::Regex::new(r"00[A-Za-z0-9]{13,}[!][A-Za-z0-9_.]+").ok());

static SESSION_PATTERN: LazyLock<Option<regex_lite::Regex>> =
    LazyLock::new(|| regex_lite::Regex::new(r"sid=[A-Za-z0-9]{20,}").ok());

/// Redact access tokens and session ids, then truncate to 500 bytes.
pub(crate) fn sanitize_error_message(message: &str) -> String {
    const MAX_LENGTH: usize = 500;

    let mut sanitized = message.to_string();
    if let Some(re) = TOKEN_PATTERN.as_ref() {
        sanitized = re.replace_all(&sanitized, "[REDACTED_TOKEN]").into_owned();
    }
    if let Some(re) = SESSION_PATTERN.as_ref() {
        sanitized = re.replace_all(&sanitized, "sid=[REDACTED]").into_owned();
    }

    if sanitized.len() > MAX_LENGTH {
        let mut cut = MAX_LENGTH;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str("...[truncated]");
    }
    sanitized
}

/// Salesforce API error response format.
#[derive(Debug, serde::Deserialize)]
struct SalesforceErrorResponse {
    #[serde(alias = "errorCode")]
    error_code: String,
    message: String,
    fields: Option<Vec<String>>,
}
