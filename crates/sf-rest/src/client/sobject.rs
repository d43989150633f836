use tracing::{debug, instrument};

use forcepipe_client::record::field_text;
use forcepipe_client::{security, Fields, Record, SalesforceResult};

use crate::error::{Error, Result};

use super::{SalesforceRestClient, ID_FIELD};

/// Remove `name` (matched case-insensitively) from the body, returning its
/// text value.
fn take_key_field(fields: &mut Fields, name: &str) -> Option<String> {
    let value = field_text(fields, name);
    let key = fields
        .keys()
        .find(|key| key.eq_ignore_ascii_case(name))
        .cloned();
    if let Some(key) = key {
        fields.remove(&key);
    }
    value
}

fn record_body<R: Record>(record: &R) -> Result<Fields> {
    let mut fields = record.to_fields()?;
    fields.remove("attributes");
    Ok(fields)
}

/// The record's `Id`, removed from the body and checked for shape.
fn take_id(fields: &mut Fields) -> Result<String> {
    let id = take_key_field(fields, ID_FIELD)
        .ok_or_else(|| Error::validation("record has no Id value"))?;
    if !security::is_valid_salesforce_id(&id) {
        return Err(Error::validation(format!("invalid Salesforce id: {id:?}")));
    }
    Ok(id)
}

impl SalesforceRestClient {
    /// Create one record.
    #[instrument(skip(self, record))]
    pub async fn insert_one<R: Record>(
        &self,
        sobject: &str,
        record: &R,
    ) -> Result<SalesforceResult> {
        security::require_sobject_name(sobject)?;
        let body = record_body(record)?;

        let url = self.client.rest_url(&format!("sobjects/{sobject}"));
        let mut result: SalesforceResult = self.client.post_json(&url, &body).await?;
        result.created = result.success;
        debug!(id = ?result.id, "Record created");
        Ok(result)
    }

    /// Update one record by its `Id`, which is sent in the URL rather than
    /// the body.
    #[instrument(skip(self, record))]
    pub async fn update_one<R: Record>(&self, sobject: &str, record: &R) -> Result<()> {
        security::require_sobject_name(sobject)?;
        let mut body = record_body(record)?;
        let id = take_id(&mut body)?;

        let url = self.client.rest_url(&format!("sobjects/{sobject}/{id}"));
        self.client.execute(self.client.patch(&url).json(&body)?).await?;
        debug!(id, "Record updated");
        Ok(())
    }

    /// Upsert one record matched on `external_id_field`.
    ///
    /// `created` tells an insert from an update. Servers that answer an
    /// update with `204 No Content` yield a result without an id.
    #[instrument(skip(self, record))]
    pub async fn upsert_one<R: Record>(
        &self,
        sobject: &str,
        external_id_field: &str,
        record: &R,
    ) -> Result<SalesforceResult> {
        security::require_sobject_name(sobject)?;
        security::require_field_name(external_id_field)?;
        let mut body = record_body(record)?;
        let external_id = take_key_field(&mut body, external_id_field).ok_or_else(|| {
            Error::validation(format!("record has no {external_id_field} value"))
        })?;

        let url = self.client.rest_url(&format!(
            "sobjects/{sobject}/{external_id_field}/{}",
            security::encode_param(&external_id)
        ));
        let response = self.client.execute(self.client.patch(&url).json(&body)?).await?;
        if response.status() == 204 {
            return Ok(SalesforceResult {
                success: true,
                ..SalesforceResult::default()
            });
        }
        let result: SalesforceResult = response.json().await?;
        debug!(id = ?result.id, created = result.created, "Record upserted");
        Ok(result)
    }

    /// Delete one record by its `Id`. Other fields are ignored.
    #[instrument(skip(self, record))]
    pub async fn delete_one<R: Record>(&self, sobject: &str, record: &R) -> Result<()> {
        security::require_sobject_name(sobject)?;
        let id = take_id(&mut record_body(record)?)?;

        let url = self.client.rest_url(&format!("sobjects/{sobject}/{id}"));
        self.client.execute(self.client.delete(&url)).await?;
        debug!(id, "Record deleted");
        Ok(())
    }
}
