//! Name and identifier checks applied before anything is interpolated into
//! a URL or a SOQL statement.
//!
//! ```rust
//! use forcepipe_client::security;
//!
//! assert!(security::is_safe_name("Custom_Field__c"));
//! assert!(!security::is_safe_name("Name'; DELETE--"));
//! assert_eq!(
//!     security::select_statement("Contact", &["Id", "Account.Name"]).unwrap(),
//!     "SELECT Id, Account.Name FROM Contact"
//! );
//! ```

use crate::error::{Error, Result};

/// An sObject or field API name: a letter followed by letters, digits or `_`.
#[must_use]
pub fn is_safe_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A field path for SELECT lists, allowing relationship traversal (`Owner.Name`).
#[must_use]
pub fn is_safe_field_path(path: &str) -> bool {
    !path.is_empty() && path.split('.').all(is_safe_name)
}

/// Fail with a validation error unless `name` is a safe sObject name.
pub fn require_sobject_name(name: &str) -> Result<()> {
    if is_safe_name(name) {
        Ok(())
    } else {
        Err(Error::validation(format!("invalid sObject name: {name:?}")))
    }
}

/// Fail with a validation error unless `name` is a safe field name.
pub fn require_field_name(name: &str) -> Result<()> {
    if is_safe_name(name) {
        Ok(())
    } else {
        Err(Error::validation(format!("invalid field name: {name:?}")))
    }
}

/// Build `SELECT f1, f2 FROM Object`, rejecting any unsafe name.
pub fn select_statement(sobject: &str, fields: &[&str]) -> Result<String> {
    require_sobject_name(sobject)?;
    if fields.is_empty() {
        return Err(Error::validation("at least one field is required"));
    }
    if let Some(bad) = fields.iter().find(|f| !is_safe_field_path(f)) {
        return Err(Error::validation(format!("invalid field name: {bad:?}")));
    }
    Ok(format!("SELECT {} FROM {}", fields.join(", "), sobject))
}

/// URL-encode a path segment or query value.
#[must_use]
pub fn encode_param(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Salesforce ids are 15 or 18 ASCII alphanumerics.
#[must_use]
pub fn is_valid_salesforce_id(id: &str) -> bool {
    matches!(id.len(), 15 | 18) && id.chars().all(|c| c.is_ascii_alphanumeric())
}
