//! Per-record outcome types shared by the bulk and synchronous write paths.

use serde::{Deserialize, Deserializer, Serialize};

/// One error reported by Salesforce against a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesforceError {
    /// Machine-readable category, e.g. `REQUIRED_FIELD_MISSING`.
    #[serde(rename = "statusCode", alias = "errorCode")]
    pub status_code: String,
    /// Human-readable message.
    pub message: String,
    /// Fields implicated by the error.
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Outcome of writing a single record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesforceResult {
    /// Record id, when the server assigned or matched one.
    #[serde(default)]
    pub id: Option<String>,
    /// Whether the record was written.
    pub success: bool,
    /// Set when an upsert created rather than updated the record.
    #[serde(default, deserialize_with = "null_as_false")]
    pub created: bool,
    /// Errors in the order Salesforce reported them.
    #[serde(default)]
    pub errors: Vec<SalesforceError>,
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl SalesforceResult {
    /// A successful outcome for `id`.
    pub fn succeeded(id: impl Into<String>, created: bool) -> Self {
        Self {
            id: Some(id.into()).filter(|id: &String| !id.is_empty()),
            success: true,
            created,
            errors: Vec::new(),
        }
    }

    /// A failed outcome carrying one error.
    pub fn failed(id: Option<String>, error: SalesforceError) -> Self {
        Self {
            id: id.filter(|id| !id.is_empty()),
            success: false,
            created: false,
            errors: vec![error],
        }
    }
}

/// Ordered collection of per-record outcomes.
///
/// Partial failure is not an error: inspect [`has_errors`](Self::has_errors)
/// and the individual results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SalesforceResults {
    results: Vec<SalesforceResult>,
}

impl SalesforceResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any member failed. Derived from the members on every call.
    pub fn has_errors(&self) -> bool {
        self.results.iter().any(|r| !r.success)
    }

    pub fn push(&mut self, result: SalesforceResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn results(&self) -> &[SalesforceResult] {
        &self.results
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SalesforceResult> {
        self.results.iter()
    }

    /// Results that did not succeed.
    pub fn failures(&self) -> impl Iterator<Item = &SalesforceResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn into_results(self) -> Vec<SalesforceResult> {
        self.results
    }
}

impl Extend<SalesforceResult> for SalesforceResults {
    fn extend<I: IntoIterator<Item = SalesforceResult>>(&mut self, iter: I) {
        self.results.extend(iter);
    }
}

impl FromIterator<SalesforceResult> for SalesforceResults {
    fn from_iter<I: IntoIterator<Item = SalesforceResult>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for SalesforceResults {
    type Item = SalesforceResult;
    type IntoIter = std::vec::IntoIter<SalesforceResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}
