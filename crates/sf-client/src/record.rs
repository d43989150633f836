//! The record capability shared by every write path.
//!
//! A record is anything that converts into an ordered field-name to value
//! mapping. Structs deriving `Serialize`, `HashMap<String, _>`, `BTreeMap`
//! and `serde_json::Value` objects all qualify through the blanket impl.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Field-name to value mapping for one record.
///
/// Field order follows the source record (struct declaration order for
/// derived structs).
pub type Fields = serde_json::Map<String, Value>;

/// A value that can be sent to Salesforce as one row or sObject.
pub trait Record {
    /// Convert the record into its field mapping.
    fn to_fields(&self) -> Result<Fields>;
}

impl<T> Record for T
where
    T: Serialize + ?Sized,
{
    fn to_fields(&self) -> Result<Fields> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            other => Err(Error::validation(format!(
                "records must be structs or string-keyed maps, got {}",
                kind_of(&other)
            ))),
        }
    }
}

/// Convert every record, failing on the first one with an unusable shape.
pub fn collect_fields<R: Record>(records: &[R]) -> Result<Vec<Fields>> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            record.to_fields().map_err(|err| {
                Error::validation(format!("record {index}: {}", err.kind))
            })
        })
        .collect()
}

/// Look up a field by name, falling back to a case-insensitive match since
/// Salesforce field names are case-insensitive.
pub fn field<'a>(fields: &'a Fields, name: &str) -> Option<&'a Value> {
    fields.get(name).or_else(|| {
        fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

/// Render a scalar field as text. Null, missing and empty values yield `None`.
pub fn field_text(fields: &Fields, name: &str) -> Option<String> {
    match field(fields, name)? {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
