//! Composite API request and response bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use forcepipe_client::{SalesforceError, SalesforceResult};

/// Most subrequests a single composite call may carry.
pub const MAX_SUBREQUESTS: usize = 25;

/// A composite request containing multiple subrequests.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeRequest {
    #[serde(rename = "allOrNone")]
    pub all_or_none: bool,
    #[serde(rename = "collateSubrequests")]
    pub collate_subrequests: bool,
    #[serde(rename = "compositeRequest")]
    pub subrequests: Vec<CompositeSubrequest>,
}

/// A single subrequest within a composite request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeSubrequest {
    pub method: String,
    /// Path relative to the instance, e.g. `/services/data/v62.0/composite/sobjects`.
    pub url: String,
    #[serde(rename = "referenceId")]
    pub reference_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Response from a composite request.
#[derive(Debug, Clone, Deserialize)]
pub struct CompositeResponse {
    #[serde(rename = "compositeResponse")]
    pub responses: Vec<CompositeSubresponse>,
}

/// Response from a single subrequest.
#[derive(Debug, Clone, Deserialize)]
pub struct CompositeSubresponse {
    #[serde(default)]
    pub body: Value,
    #[serde(rename = "httpHeaders", default)]
    pub http_headers: Value,
    #[serde(rename = "httpStatusCode")]
    pub http_status_code: u16,
    #[serde(rename = "referenceId")]
    pub reference_id: String,
}

impl CompositeSubresponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_status_code)
    }

    /// Per-record results of a collections subrequest covering `expected`
    /// records.
    ///
    /// A failed subrequest answers with a list of errors instead of results;
    /// every record of the batch is then reported failed with the first
    /// error (or a generic one when the body carries none).
    pub fn into_results(self, expected: usize) -> Result<Vec<SalesforceResult>, serde_json::Error> {
        if self.is_success() {
            return serde_json::from_value(self.body);
        }
        let errors: Vec<SalesforceError> = serde_json::from_value(self.body).unwrap_or_default();
        let error = errors.into_iter().next().unwrap_or_else(|| SalesforceError {
            status_code: "UNKNOWN_ERROR".to_string(),
            message: format!("subrequest failed with status {}", self.http_status_code),
            fields: Vec::new(),
        });
        Ok((0..expected)
            .map(|_| SalesforceResult::failed(None, error.clone()))
            .collect())
    }
}
