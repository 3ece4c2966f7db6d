//! Engine error taxonomy
//!
//! Every public boundary returns `Result<T, EngineError>`. The variants are
//! the externally surfaced error kinds; backend failures fold into
//! `StorageFailure` so callers never see driver-specific codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Engine error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Caller-fixable input problem (empty agent, oversized content, out-of-range value)
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Referenced id absent where the operation requires it
    #[error("not found: {0}")]
    NotFound(String),
    /// Backend write or read failed; the current chunk was rolled back
    #[error("storage failure: {0}")]
    StorageFailure(String),
    /// Backend or required capability cannot be reached
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    /// A belief conflict could not be resolved by the configured strategy
    #[error("conflict unresolved: {0}")]
    ConflictUnresolved(String),
    /// Relationship violates a graph invariant
    #[error("invalid edge: {0}")]
    InvalidEdge(String),
    /// Unknown export/import format
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Engine result type
pub type Result<T> = std::result::Result<T, EngineError>;

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::StorageFailure(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::StorageFailure(e.to_string())
    }
}

impl EngineError {
    /// Stable machine-readable kind name
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidInput(_) => ErrorKind::InvalidInput,
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::StorageFailure(_) => ErrorKind::StorageFailure,
            EngineError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            EngineError::ConflictUnresolved(_) => ErrorKind::ConflictUnresolved,
            EngineError::InvalidEdge(_) => ErrorKind::InvalidEdge,
            EngineError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
        }
    }

    /// Build the user-visible report for this error
    pub fn report(&self, timestamp: DateTime<Utc>) -> ErrorReport {
        ErrorReport {
            timestamp,
            kind: self.kind(),
            reason: self.to_string(),
        }
    }
}

/// Externally surfaced error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    StorageFailure,
    BackendUnavailable,
    ConflictUnresolved,
    InvalidEdge,
    UnsupportedFormat,
}

impl ErrorKind {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalidInput",
            ErrorKind::NotFound => "notFound",
            ErrorKind::StorageFailure => "storageFailure",
            ErrorKind::BackendUnavailable => "backendUnavailable",
            ErrorKind::ConflictUnresolved => "conflictUnresolved",
            ErrorKind::InvalidEdge => "invalidEdge",
            ErrorKind::UnsupportedFormat => "unsupportedFormat",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a caller sees when an operation fails
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// When the failure was observed
    pub timestamp: DateTime<Utc>,
    /// Error kind
    pub kind: ErrorKind,
    /// Short human-readable reason
    pub reason: String,
}
