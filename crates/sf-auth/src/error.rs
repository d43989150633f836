//! Error types for forcepipe-auth.
//!
//! Messages never include token values.

/// Result type alias for forcepipe-auth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for forcepipe-auth operations.
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
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Credentials are incomplete or malformed.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Environment variable not set.
    #[error("Environment variable not set: {0}")]
    EnvVar(String),

    /// Building the HTTP client from the credentials failed.
    #[error("Client error: {0}")]
    Client(String),
}

impl From<forcepipe_client::Error> for Error {
    fn from(err: forcepipe_client::Error) -> Self {
        let message = err.to_string();
        let sanitized = if message.contains("Bearer") || message.contains("token") {
            "Client error (details redacted)".to_string()
        } else {
            message
        };
        Error::with_source(ErrorKind::Client(sanitized), err)
    }
}
