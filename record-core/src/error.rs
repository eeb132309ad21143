//! Error types for record construction

use crate::{
    record_list::BuilderHandle,
    types::{ChildList, ResponseCode},
};
use thiserror::Error;

/// Result type for record operations
pub type Result<T> = std::result::Result<T, Error>;

/// Record construction errors
#[derive(Error, Debug)]
pub enum Error {
    /// Preceding or following slot requested past its configured maximum
    #[error("Maximum child records exceeded: {kind} limit is {limit}")]
    MaxChildRecordsExceeded {
        /// Which list overflowed
        kind: ChildList,
        /// Configured maximum
        limit: u64,
    },

    /// Revert target is neither the user builder nor a following builder
    #[error("Record builder not found: {0}")]
    BuilderNotFound(BuilderHandle),

    /// Stored transaction cannot be parsed back into a body
    #[error("Record being built for unparseable transaction: {0}")]
    UnparseableTransaction(String),

    /// Internal invariant broken by the caller
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Status a handler should externalize for this failure, if any
    pub fn status(&self) -> Option<ResponseCode> {
        match self {
            Error::MaxChildRecordsExceeded { .. } => Some(ResponseCode::MaxChildRecordsExceeded),
            Error::UnparseableTransaction(_) | Error::InvariantViolation(_) => {
                Some(ResponseCode::FailInvalid)
            }
            _ => None,
        }
    }

    /// Whether this error means the calling engine broke an invariant
    ///
    /// Fatal errors can make two nodes diverge; they must reach a node-level alarm.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::BuilderNotFound(_)
                | Error::UnparseableTransaction(_)
                | Error::InvariantViolation(_)
        )
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_error_is_recoverable() {
        let err = Error::MaxChildRecordsExceeded {
            kind: ChildList::Preceding,
            limit: 3,
        };
        assert_eq!(err.status(), Some(ResponseCode::MaxChildRecordsExceeded));
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("preceding limit is 3"));
    }

    #[test]
    fn test_structural_errors_are_fatal() {
        assert!(Error::BuilderNotFound(BuilderHandle(7)).is_fatal());
        assert!(Error::UnparseableTransaction("eof".into()).is_fatal());
        assert!(!Error::from("boom").is_fatal());
    }
}
