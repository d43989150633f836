//! Batch partitioning shared by the bulk, collection and composite paths.

use crate::error::{Error, Result};
use crate::record::{collect_fields, field_text, Fields, Record};

/// Hard batch-size ceilings imposed by the remote service per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchLimit {
    /// sObject Collections and Composite requests: at most 200 records.
    Collection,
    /// Bulk API 2.0 uploads: at most 10,000 records per batch.
    Bulk,
}

impl BatchLimit {
    /// Largest size the service accepts.
    pub const fn max(self) -> usize {
        match self {
            BatchLimit::Collection => 200,
            BatchLimit::Bulk => 10_000,
        }
    }

    /// Returns true if `size` is within `1..=max`.
    pub fn allows(self, size: usize) -> bool {
        (1..=self.max()).contains(&size)
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            BatchLimit::Collection => "batch size",
            BatchLimit::Bulk => "bulk batch size",
        }
    }
}

/// Check a requested batch size against the configured maximum for its call site.
pub fn validate_batch_size(size: usize, max: usize) -> Result<()> {
    if size == 0 || size > max {
        return Err(Error::validation(format!(
            "batch size must be between 1 and {max}, got {size}"
        )));
    }
    Ok(())
}

/// Split `items` into `ceil(len / size)` ordered slices of at most `size` items.
///
/// Every item lands in exactly one slice and the original order is kept; only
/// the last slice may be shorter than `size`.
pub fn partition<T>(items: &[T], size: usize) -> Result<Vec<&[T]>> {
    if size == 0 {
        return Err(Error::validation("batch size must be at least 1"));
    }
    Ok(items.chunks(size).collect())
}

/// Convert records to field maps and split them into batches.
///
/// `max` is the configured ceiling for the call site (see
/// [`ClientConfig::batch_max`](crate::ClientConfig::batch_max)).
pub fn partition_records<R: Record>(
    records: &[R],
    size: usize,
    max: usize,
) -> Result<Vec<Vec<Fields>>> {
    validate_batch_size(size, max)?;
    let fields = collect_fields(records)?;
    Ok(fields.chunks(size).map(<[Fields]>::to_vec).collect())
}

/// Require a non-empty value for `name` on every record.
///
/// Used for `Id` on update and delete, and for the external id on upsert.
pub fn require_field(records: &[Fields], name: &str) -> Result<()> {
    match records
        .iter()
        .position(|fields| field_text(fields, name).is_none())
    {
        Some(index) => Err(Error::validation(format!(
            "record {index} is missing a value for required field {name}"
        ))),
        None => Ok(()),
    }
}
