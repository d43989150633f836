//! Credentials trait and the standard implementation.
//!
//! Token acquisition happens elsewhere; this crate only carries the result.
//! All credential types implement a custom Debug that redacts the token.

use forcepipe_client::{ClientConfig, SalesforceClient};
use tracing::debug;

use crate::error::{Error, ErrorKind, Result};

/// Anything that can hand over an instance URL, a bearer token and an API version.
pub trait Credentials: Send + Sync {
    /// Get the Salesforce instance URL.
    fn instance_url(&self) -> &str;

    /// Get the access token.
    fn access_token(&self) -> &str;

    /// Get the API version (e.g., "62.0").
    fn api_version(&self) -> &str;

    /// Returns true if the credentials appear to be valid (non-empty).
    fn is_valid(&self) -> bool {
        !self.instance_url().is_empty() && !self.access_token().is_empty()
    }

    /// Build an authenticated client. The credentials' API version wins over
    /// the one in `config`.
    fn client(&self, config: ClientConfig) -> Result<SalesforceClient> {
        if !self.is_valid() {
            return Err(Error::new(ErrorKind::InvalidCredentials(
                "instance URL and access token are required".to_string(),
            )));
        }
        let client =
            SalesforceClient::with_config(self.instance_url(), self.access_token(), config)?;
        Ok(client.with_api_version(self.api_version()))
    }
}

/// Standard Salesforce credentials.
#[derive(Clone)]
pub struct SalesforceCredentials {
    instance_url: String,
    access_token: String,
    api_version: String,
}

impl std::fmt::Debug for SalesforceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceCredentials")
            .field("instance_url", &self.instance_url)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl SalesforceCredentials {
    /// Create new credentials with the given values.
    pub fn new(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            instance_url: instance_url.into(),
            access_token: access_token.into(),
            api_version: api_version.into(),
        }
    }

    /// Load credentials from environment variables.
    ///
    /// Required:
    /// - `SF_INSTANCE_URL` or `SALESFORCE_INSTANCE_URL`
    /// - `SF_ACCESS_TOKEN` or `SALESFORCE_ACCESS_TOKEN`
    ///
    /// Optional:
    /// - `SF_API_VERSION` or `SALESFORCE_API_VERSION` (default: "62.0")
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let pick = |primary: &str, fallback: &str| {
            lookup(primary)
                .or_else(|| lookup(fallback))
                .filter(|v| !v.trim().is_empty())
        };

        let instance_url = pick("SF_INSTANCE_URL", "SALESFORCE_INSTANCE_URL")
            .ok_or_else(|| Error::new(ErrorKind::EnvVar("SF_INSTANCE_URL".to_string())))?;
        let access_token = pick("SF_ACCESS_TOKEN", "SALESFORCE_ACCESS_TOKEN")
            .ok_or_else(|| Error::new(ErrorKind::EnvVar("SF_ACCESS_TOKEN".to_string())))?;
        let api_version = pick("SF_API_VERSION", "SALESFORCE_API_VERSION")
            .unwrap_or_else(|| forcepipe_client::DEFAULT_API_VERSION.to_string());

        url::Url::parse(&instance_url).map_err(|e| {
            Error::with_source(
                ErrorKind::InvalidCredentials(format!("instance URL is not a URL: {e}")),
                e,
            )
        })?;

        debug!(
            instance_url = %instance_url,
            api_version = %api_version,
            "Loaded credentials from environment"
        );
        Ok(Self::new(instance_url, access_token, api_version))
    }
}

impl Credentials for SalesforceCredentials {
    fn instance_url(&self) -> &str {
        &self.instance_url
    }

    fn access_token(&self) -> &str {
        &self.access_token
    }

    fn api_version(&self) -> &str {
        &self.api_version
    }
}
