//! Client configuration.
//!
//! A [`ClientConfig`] is assembled with [`ClientConfig::builder`] and checked
//! once in [`ClientConfigBuilder::build`]. After that it is immutable and can
//! be shared by any number of concurrent pipeline invocations.

use crate::batch::BatchLimit;
use crate::error::{Error, ErrorKind, Result};
use crate::retry::RetryConfig;
use std::time::Duration;

/// Configuration for the HTTP client and the batch limits of every call site.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Salesforce API version, without the leading `v` (e.g. "62.0").
    pub api_version: String,
    /// Largest batch accepted by the collection and composite paths (1..=200).
    pub batch_size_max: usize,
    /// Largest batch accepted by the bulk ingest path (1..=10000).
    pub bulk_batch_size_max: usize,
    /// Retry configuration for synchronous calls.
    pub retry: Option<RetryConfig>,
    /// Compression configuration.
    pub compression: CompressionConfig,
    /// Request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Pool idle timeout.
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections per host.
    pub pool_max_idle_per_host: usize,
    /// User-Agent header value.
    pub user_agent: String,
    /// Whether to enable request/response tracing.
    pub enable_tracing: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_version: crate::DEFAULT_API_VERSION.to_string(),
            batch_size_max: BatchLimit::Collection.max(),
            bulk_batch_size_max: BatchLimit::Bulk.max(),
            retry: Some(RetryConfig::default()),
            compression: CompressionConfig::default(),
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: crate::USER_AGENT.to_string(),
            enable_tracing: true,
        }
    }
}

impl ClientConfig {
    /// Create a new client config builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// The configured maximum for a call site.
    pub fn batch_max(&self, limit: BatchLimit) -> usize {
        match limit {
            BatchLimit::Collection => self.batch_size_max,
            BatchLimit::Bulk => self.bulk_batch_size_max,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.api_version.trim().is_empty() {
            return Err(Error::new(ErrorKind::Config(
                "API version cannot be empty".to_string(),
            )));
        }
        for (limit, value) in [
            (BatchLimit::Collection, self.batch_size_max),
            (BatchLimit::Bulk, self.bulk_batch_size_max),
        ] {
            if !limit.allows(value) {
                return Err(Error::new(ErrorKind::Config(format!(
                    "{} max must be between 1 and {}",
                    limit.label(),
                    limit.max()
                ))));
            }
        }
        Ok(())
    }
}

/// Builder for ClientConfig.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the API version (e.g. "61.0").
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    /// Set the maximum batch size for collection and composite calls.
    pub fn with_batch_size_max(mut self, size: usize) -> Self {
        self.config.batch_size_max = size;
        self
    }

    /// Set the maximum batch size for bulk ingest calls.
    pub fn with_bulk_batch_size_max(mut self, size: usize) -> Self {
        self.config.bulk_batch_size_max = size;
        self
    }

    /// Set the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = Some(retry);
        self
    }

    /// Disable retries.
    pub fn without_retry(mut self) -> Self {
        self.config.retry = None;
        self
    }

    /// Enable or disable compressed responses.
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.config.compression = if enabled {
            CompressionConfig::full()
        } else {
            CompressionConfig::disabled()
        };
        self
    }

    /// Set compression configuration.
    pub fn with_compression_config(mut self, config: CompressionConfig) -> Self {
        self.config.compression = config;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set pool idle timeout.
    pub fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    /// Set maximum idle connections per host.
    pub fn with_pool_max_idle(mut self, max: usize) -> Self {
        self.config.pool_max_idle_per_host = max;
        self
    }

    /// Set custom User-Agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Enable or disable request/response tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.config.enable_tracing = enabled;
        self
    }

    /// Validate and build the client configuration.
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration for response compression.
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    /// Whether compression is enabled.
    pub enabled: bool,
    /// Send `Accept-Encoding` and transparently inflate gzip/deflate bodies.
    pub accept_compressed: bool,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

impl CompressionConfig {
    /// Disable all compression.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            accept_compressed: false,
        }
    }

    /// Accept gzip and deflate encoded responses.
    pub fn full() -> Self {
        Self {
            enabled: true,
            accept_compressed: true,
        }
    }
}
