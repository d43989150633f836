//! SObject Collections request bodies.

use serde::Serialize;
use serde_json::{json, Value};

use forcepipe_client::Fields;

/// Body of a collections create, update or upsert call (up to 200 records).
#[derive(Debug, Clone, Serialize)]
pub struct CollectionRequest {
    #[serde(rename = "allOrNone")]
    pub all_or_none: bool,
    pub records: Vec<Value>,
}

impl CollectionRequest {
    /// Tag every record with `attributes.type` as the endpoint requires.
    pub fn new(sobject: &str, batch: &[Fields], all_or_none: bool) -> Self {
        let records = batch
            .iter()
            .map(|fields| {
                let mut record = serde_json::Map::with_capacity(fields.len() + 1);
                record.insert("attributes".to_string(), json!({ "type": sobject }));
                record.extend(
                    fields
                        .iter()
                        .filter(|(key, _)| *key != "attributes")
                        .map(|(key, value)| (key.clone(), value.clone())),
                );
                Value::Object(record)
            })
            .collect();
        Self {
            all_or_none,
            records,
        }
    }
}

/// Query string for a collections delete: `ids=a,b&allOrNone=false`.
pub(crate) fn delete_query(ids: &[String], all_or_none: bool) -> String {
    format!("ids={}&allOrNone={}", ids.join(","), all_or_none)
}
