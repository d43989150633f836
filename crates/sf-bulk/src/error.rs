//! Error types for forcepipe-bulk.
//!
//! Every remote or cancellation error names the pipeline [`Stage`] it came
//! from, so callers can tell a failed upload from a failed poll.

use std::fmt;

use crate::types::JobState;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Pipeline stage that issued the failing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CreateJob,
    Upload,
    Close,
    Poll,
    FetchResults,
    Abort,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::CreateJob => "create job",
            Stage::Upload => "upload batch",
            Stage::Close => "close job",
            Stage::Poll => "poll job",
            Stage::FetchResults => "fetch results",
            Stage::Abort => "abort job",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Caller-supplied shape, size or field violation. Raised before any request.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Non-2xx response, or no response at all, during a stage.
    #[error(
        "{stage} failed{}: {message}",
        status.map(|s| format!(" with status {s}")).unwrap_or_default()
    )]
    Remote {
        stage: Stage,
        status: Option<u16>,
        message: String,
    },

    /// The cancellation token fired while the stage was waiting.
    #[error("{stage} cancelled")]
    Cancelled { stage: Stage },

    /// The server finished the job in `Aborted` or `Failed`.
    #[error("Job {job_id} ended in state {state:?}: {message}")]
    JobFailed {
        job_id: String,
        state: JobState,
        message: String,
    },

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Client error: {0}")]
    Client(String),
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation(message.into()))
    }

    pub(crate) fn cancelled(stage: Stage) -> Self {
        Self::new(ErrorKind::Cancelled { stage })
    }

    /// Attribute a transport error to `stage`. Validation failures from the
    /// client layer stay validation failures.
    pub(crate) fn at(stage: Stage, err: forcepipe_client::Error) -> Self {
        if err.is_validation() {
            return Error {
                kind: ErrorKind::Validation(err.kind.to_string()),
                source: Some(Box::new(err)),
            };
        }
        Error {
            kind: ErrorKind::Remote {
                stage,
                status: err.status(),
                message: err.to_string(),
            },
            source: Some(Box::new(err)),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.kind, ErrorKind::Validation(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled { .. })
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.kind, ErrorKind::Remote { .. })
    }

    /// Stage named by a remote or cancellation error.
    pub fn stage(&self) -> Option<Stage> {
        match self.kind {
            ErrorKind::Remote { stage, .. } | ErrorKind::Cancelled { stage } => Some(stage),
            _ => None,
        }
    }

    /// HTTP status of a remote error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            ErrorKind::Remote { status, .. } => status,
            _ => None,
        }
    }
}

impl From<forcepipe_client::Error> for Error {
    fn from(err: forcepipe_client::Error) -> Self {
        if err.is_validation() {
            return Error {
                kind: ErrorKind::Validation(err.kind.to_string()),
                source: Some(Box::new(err)),
            };
        }
        Error { kind: ErrorKind::Client(err.to_string()), source: Some(Box::new(err)) }
    }
}

impl From<forcepipe_auth::Error> for Error {
    fn from(err: forcepipe_auth::Error) -> Self {
        Error { kind: ErrorKind::Client(err.to_string()), source: Some(Box::new(err)) }
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error { kind: ErrorKind::Csv(err.to_string()), source: Some(Box::new(err)) }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error { kind: ErrorKind::Io(err.to_string()), source: Some(Box::new(err)) }
    }
}
