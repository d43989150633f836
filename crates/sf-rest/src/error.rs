//! Error types for forcepipe-rest.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Input rejected before any request was sent.
    #[error("validation error: {0}")]
    Validation(String),

    /// Non-2xx answer to a collections or composite call.
    #[error("request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    /// A call-level error reported by Salesforce in the response body.
    #[error("{error_code}: {message}")]
    Salesforce {
        status: u16,
        error_code: String,
        message: String,
    },

    #[error("client error: {0}")]
    Client(String),
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation(message.into()))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.kind, ErrorKind::Validation(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self.kind {
            ErrorKind::Http { status, .. } | ErrorKind::Salesforce { status, .. } => Some(status),
            _ => None,
        }
    }
}

impl From<forcepipe_client::Error> for Error {
    fn from(err: forcepipe_client::Error) -> Self {
        let kind = if err.is_validation() {
            ErrorKind::Validation(err.kind.to_string())
        } else if let forcepipe_client::ErrorKind::SalesforceApi {
            status,
            error_code,
            message,
            ..
        } = &err.kind
        {
            ErrorKind::Salesforce {
                status: *status,
                error_code: error_code.clone(),
                message: message.clone(),
            }
        } else if let Some(status) = err.status() {
            ErrorKind::Http {
                status,
                message: err.kind.to_string(),
            }
        } else {
            ErrorKind::Client(err.to_string())
        };
        Error {
            kind,
            source: Some(Box::new(err)),
        }
    }
}

impl From<forcepipe_auth::Error> for Error {
    fn from(err: forcepipe_auth::Error) -> Self {
        Error {
            kind: ErrorKind::Client(err.to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Client(format!("unexpected response body: {err}")),
            source: Some(Box::new(err)),
        }
    }
}
