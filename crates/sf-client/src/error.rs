//! Error types for forcepipe-client.

use std::time::Duration;

/// Result type alias for forcepipe-client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for forcepipe-client operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Shorthand for a caller-side validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation(message.into()))
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Returns true if this is a rate limit error.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self.kind, ErrorKind::RateLimited { .. })
    }

    /// Returns true if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Authentication(_))
    }

    /// Returns true if the caller supplied an invalid shape, size or field.
    pub fn is_validation(&self) -> bool {
        matches!(self.kind, ErrorKind::Validation(_) | ErrorKind::Config(_))
    }

    /// HTTP status associated with this error, when the server produced one.
    pub fn status(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Http { status, .. } => Some(*status),
            ErrorKind::RateLimited { .. } => Some(429),
            ErrorKind::Authentication(_) => Some(401),
            ErrorKind::Authorization(_) => Some(403),
            ErrorKind::NotFound(_) => Some(404),
            ErrorKind::PreconditionFailed(_) => Some(412),
            ErrorKind::SalesforceApi { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the retry-after duration if this is a rate limit error.
    pub fn retry_after(&self) -> Option<Duration> {
        match &self.kind {
            ErrorKind::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// HTTP request failed.
    #[error("HTTP error: {status} {message}")]
    Http { status: u16, message: String },

    /// Rate limit exceeded (HTTP 429).
    #[error(
        "Rate limited{}",
        retry_after.map(|d| format!(", retry after {:?}", d)).unwrap_or_default()
    )]
    RateLimited { retry_after: Option<Duration> },

    /// Authentication error (HTTP 401).
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Authorization error (HTTP 403).
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Resource not found (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Precondition failed (HTTP 412).
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Request timeout.
    #[error("Request timeout")]
    Timeout,

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller-supplied records, sizes or fields are unusable.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Salesforce API error response.
    #[error("Salesforce API error: {error_code} - {message}")]
    SalesforceApi {
        status: u16,
        error_code: String,
        message: String,
        fields: Vec<String>,
    },

    /// All retries exhausted.
    #[error("All {attempts} retry attempts exhausted")]
    RetriesExhausted { attempts: u32 },

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl ErrorKind {
    /// Returns true if this error kind is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ErrorKind::RateLimited { .. } => true,
            ErrorKind::Timeout => true,
            ErrorKind::Connection(_) => true,
            ErrorKind::Http { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Check if an HTTP status code is typically retryable.
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_connect() {
            ErrorKind::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            ErrorKind::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ErrorKind::Other(err.to_string())
        };

        Error::with_source(kind, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(ErrorKind::InvalidUrl(err.to_string()), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        assert!(Error::new(ErrorKind::RateLimited { retry_after: None }).is_retryable());
        assert!(Error::new(ErrorKind::Timeout).is_retryable());
        assert!(Error::new(ErrorKind::Http {
            status: 503,
            message: "Service unavailable".to_string(),
        })
        .is_retryable());

        assert!(!Error::new(ErrorKind::NotFound("resource".to_string())).is_retryable());
        assert!(!Error::validation("batch size").is_retryable());
    }

    #[test]
    fn test_error_is_rate_limited() {
        let err = Error::new(ErrorKind::RateLimited {
            retry_after: Some(Duration::from_secs(30)),
        });
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(err.status(), Some(429));

        let err = Error::new(ErrorKind::Timeout);
        assert!(!err.is_rate_limited());
        assert_eq!(err.retry_after(), None);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_validation_errors() {
        let err = Error::validation("batch size max must be between 1 and 200");
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "Validation error: batch size max must be between 1 and 200"
        );

        let err = Error::new(ErrorKind::Config("api version is empty".into()));
        assert!(err.is_validation());
        assert!(!Error::new(ErrorKind::Timeout).is_validation());
    }

    #[test]
    fn test_salesforce_api_error_carries_status() {
        let err = Error::new(ErrorKind::SalesforceApi {
            status: 400,
            error_code: "INVALIDJOB".to_string(),
            message: "Unable to find object: Acount".to_string(),
            fields: vec![],
        });

        assert!(!err.is_retryable());
        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("INVALIDJOB"));
    }

    #[test]
    fn test_error_kind_display_messages() {
        let cases: Vec<(ErrorKind, &str)> = vec![
            (
                ErrorKind::Http {
                    status: 500,
                    message: "Internal Server Error".into(),
                },
                "HTTP error: 500 Internal Server Error",
            ),
            (ErrorKind::RateLimited { retry_after: None }, "Rate limited"),
            (
                ErrorKind::Authentication("expired token".into()),
                "Authentication error: expired token",
            ),
            (ErrorKind::Timeout, "Request timeout"),
            (
                ErrorKind::InvalidUrl("no scheme".into()),
                "Invalid URL: no scheme",
            ),
            (
                ErrorKind::RetriesExhausted { attempts: 3 },
                "All 3 retry attempts exhausted",
            ),
            (ErrorKind::Other("something else".into()), "something else"),
        ];

        for (kind, expected_substring) in cases {
            let display = kind.to_string();
            assert!(
                display.contains(expected_substring),
                "Expected '{display}' to contain '{expected_substring}'"
            );
        }
    }

    #[test]
    fn test_from_url_parse_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err.kind, ErrorKind::InvalidUrl(_)));
        assert!(err.source.is_some());
    }
}
