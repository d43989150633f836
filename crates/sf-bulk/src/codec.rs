//! CSV encoding and decoding for Bulk API 2.0 bodies.
//!
//! Uses the `csv` crate on both sides so embedded delimiters, quotes and
//! newlines survive the trip.

use bytes::Bytes;
use csv::{ReaderBuilder, Terminator, Writer, WriterBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;

use forcepipe_client::record::field_text;
use forcepipe_client::{Fields, SalesforceError, SalesforceResult};

use crate::error::{Error, ErrorKind, Result};
use crate::types::ColumnDelimiter;

/// Column Salesforce uses for record ids in uploads.
pub const ID_FIELD: &str = "Id";

const SF_ID: &str = "sf__Id";
const SF_CREATED: &str = "sf__Created";
const SF_ERROR: &str = "sf__Error";

fn writer(delimiter: ColumnDelimiter) -> Writer<Vec<u8>> {
    WriterBuilder::new()
        .delimiter(delimiter.byte())
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish(writer: Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::new(ErrorKind::Csv(e.to_string())))?;
    String::from_utf8(bytes).map_err(|e| Error::new(ErrorKind::Csv(e.to_string())))
}

fn cell(value: &Value, name: &str, index: usize) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Array(_) | Value::Object(_) => Err(Error::validation(format!(
            "record {index}: field {name} is nested; bulk rows only carry flat values"
        ))),
    }
}

/// Check that every record carries exactly the first record's field names
/// and only flat values.
pub fn check_uniform(records: &[Fields]) -> Result<()> {
    let Some(first) = records.first() else {
        return Err(Error::validation("no records to encode"));
    };
    if first.is_empty() {
        return Err(Error::validation("record 0 has no fields"));
    }
    for (index, record) in records.iter().enumerate() {
        if record.len() != first.len() {
            return Err(Error::validation(format!(
                "record {index} has {} fields, expected {} like the first record",
                record.len(),
                first.len()
            )));
        }
        for (name, value) in record {
            if !first.contains_key(name) {
                return Err(Error::validation(format!(
                    "record {index} has field {name} which the first record lacks"
                )));
            }
            if value.is_array() || value.is_object() {
                return Err(Error::validation(format!(
                    "record {index}: field {name} is nested; bulk rows only carry flat values"
                )));
            }
        }
    }
    Ok(())
}

/// Encode a batch as CSV: a header row taken from the first record, then
/// one row per record in input order.
///
/// Every record must carry exactly the first record's field names.
pub fn encode_records(records: &[Fields], delimiter: ColumnDelimiter) -> Result<String> {
    check_uniform(records)?;
    let header: Vec<&str> = records[0].keys().map(String::as_str).collect();

    let mut out = writer(delimiter);
    out.write_record(&header)?;

    let mut row = Vec::with_capacity(header.len());
    for (index, record) in records.iter().enumerate() {
        row.clear();
        for name in &header {
            let value = record.get(*name).unwrap_or(&Value::Null);
            row.push(cell(value, name, index)?);
        }
        out.write_record(&row)?;
    }

    finish(out)
}

/// Encode only the `Id` column, as the delete operation expects.
pub fn encode_ids(records: &[Fields], delimiter: ColumnDelimiter) -> Result<String> {
    if records.is_empty() {
        return Err(Error::validation("cannot encode an empty batch"));
    }
    let mut out = writer(delimiter);
    out.write_record([ID_FIELD])?;
    for (index, record) in records.iter().enumerate() {
        let id = field_text(record, ID_FIELD).ok_or_else(|| {
            Error::validation(format!("record {index} is missing a value for {ID_FIELD}"))
        })?;
        out.write_record([id])?;
    }
    finish(out)
}

/// Decode a CSV body into `T`, matching columns to fields by name.
///
/// Unknown columns are skipped. An empty or header-only body yields an
/// empty vector.
pub fn decode_records<T: DeserializeOwned>(
    body: &[u8],
    delimiter: ColumnDelimiter,
) -> Result<Vec<T>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter.byte())
        .from_reader(body);
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(Into::into)
}

/// Which ingest result page a body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Successful,
    Failed,
}

/// Decode a `successfulResults` or `failedResults` page into per-record outcomes.
pub fn decode_ingest_results(
    body: &[u8],
    delimiter: ColumnDelimiter,
    kind: ResultKind,
) -> Result<Vec<SalesforceResult>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter.byte())
        .from_reader(body);
    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let (id_col, created_col, error_col) = (column(SF_ID), column(SF_CREATED), column(SF_ERROR));

    let mut results = Vec::new();
    for row in reader.records() {
        let row = row?;
        let get = |col: Option<usize>| col.and_then(|c| row.get(c)).unwrap_or_default();
        let id = get(id_col).to_string();
        let result = match kind {
            ResultKind::Successful => {
                SalesforceResult::succeeded(id, get(created_col).eq_ignore_ascii_case("true"))
            }
            ResultKind::Failed => {
                SalesforceResult::failed(Some(id), parse_record_error(get(error_col)))
            }
        };
        results.push(result);
    }
    Ok(results)
}

/// Split `CODE:message` into its parts. A trailing `[A, B]` in the message
/// names the implicated fields.
fn parse_record_error(raw: &str) -> SalesforceError {
    let (status_code, message) = match raw.split_once(':') {
        Some((code, message)) if !code.is_empty() && !code.contains(' ') => {
            (code.to_string(), message.trim().to_string())
        }
        _ => ("UNKNOWN_ERROR".to_string(), raw.trim().to_string()),
    };
    let fields = message
        .rfind('[')
        .and_then(|start| {
            let rest = &message[start + 1..];
            rest.find(']').map(|end| &rest[..end])
        })
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    SalesforceError { status_code, message, fields }
}

/// Re-chunk a CSV document into bodies of at most `batch_size` data rows,
/// each starting with the original header row.
///
/// When `required` names a column, the header must contain it (matched
/// case-insensitively) and every row must carry a non-blank value in it.
pub fn split_csv(
    data: &[u8],
    batch_size: usize,
    delimiter: ColumnDelimiter,
    required: Option<&str>,
) -> Result<Vec<Bytes>> {
    if batch_size == 0 {
        return Err(Error::validation("batch size must be at least 1"));
    }
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .delimiter(delimiter.byte())
        .from_reader(data);
    let headers = reader.byte_headers()?.clone();
    if headers.is_empty() {
        return Err(Error::validation("CSV file has no header row"));
    }
    let required = match required {
        Some(column) => {
            let index = headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(column.as_bytes()))
                .ok_or_else(|| Error::validation(format!("CSV file has no {column} column")))?;
            Some((column, index))
        }
        None => None,
    };

    let mut chunks = Vec::new();
    let mut current: Option<(Writer<Vec<u8>>, usize)> = None;
    for (row, record) in reader.byte_records().enumerate() {
        let record = record?;
        if let Some((column, index)) = required {
            let blank = record
                .get(index)
                .is_none_or(|value| value.iter().all(u8::is_ascii_whitespace));
            if blank {
                return Err(Error::validation(format!(
                    "row {} has no {column} value",
                    row + 1
                )));
            }
        }
        if current.is_none() {
            let mut out = writer(delimiter);
            out.write_byte_record(&headers)?;
            current = Some((out, 0));
        }
        let Some((out, rows)) = current.as_mut() else {
            continue;
        };
        out.write_byte_record(&record)?;
        *rows += 1;
        if *rows == batch_size {
            if let Some((out, _)) = current.take() {
                chunks.push(into_bytes(out)?);
            }
        }
    }
    if let Some((out, _)) = current.take() {
        chunks.push(into_bytes(out)?);
    }
    Ok(chunks)
}

fn into_bytes(writer: Writer<Vec<u8>>) -> Result<Bytes> {
    writer
        .into_inner()
        .map(Bytes::from)
        .map_err(|e| Error::new(ErrorKind::Csv(e.to_string())))
}

/// The body minus its first line, for appending later pages under one header.
pub(crate) fn strip_header(body: &[u8]) -> &[u8] {
    match body.iter().position(|&b| b == b'\n') {
        Some(pos) => &body[pos + 1..],
        None => &[],
    }
}
