//! Error types and handling for the signature processing engine.

use std::io;
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error;

/// Custom result type for engine operations
pub type Result<T> = StdResult<T, Error>;

/// Core error type for engine operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A source document could not be opened or parsed. Recoverable at the
    /// run level: the document is skipped with a warning.
    #[error("Could not read {path}: {reason}")]
    DocumentUnreadable { path: PathBuf, reason: String },

    /// No signature pages were detected across any input document.
    /// Fatal for a packet job.
    #[error("No signature pages detected in any documents.")]
    NoSignersDetected,

    /// The signed document is password-encrypted (content encryption,
    /// not just permission flags) and could not be opened.
    #[error(
        "The signed PDF is password protected and cannot be unlocked. \
         Please contact the sender for the password."
    )]
    RestrictionUnlockFailed,

    /// The job description itself is unusable; surfaced before any
    /// processing begins.
    #[error("Invalid job input: {0}")]
    InvalidJobInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("DOCX error: {0}")]
    Docx(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Job cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wraps a document-level failure so callers can skip and continue.
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::DocumentUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that abort a single document rather than the run.
    pub fn is_document_local(&self) -> bool {
        matches!(
            self,
            Error::DocumentUnreadable { .. } | Error::UnsupportedFormat(_)
        )
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Docx(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Docx(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(format!("worker task failed: {err}"))
    }
}
