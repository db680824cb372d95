//! Error types for the TTL refresher
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Store Error Enum ==
/// Errors surfaced by a key-value store round trip.
///
/// Per-command failures inside a pipeline are not errors at this level; they
/// are reported as [`CommandOutcome::Failed`](crate::store::CommandOutcome).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Store unreachable or the connection dropped mid round trip
    #[error("Transport error: {0}")]
    Transport(String),

    /// Round trip exceeded the client's timeout
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Store replied with something the client could not interpret
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl StoreError {
    /// True for failures that a later attempt may not hit again.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transport(_) | StoreError::Timeout(_))
    }
}

// == Key Parse Error Enum ==
/// Reasons a scanned key is not a room record key.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyParseError {
    /// Key lacks the `Room:` namespace
    #[error("key is not in the Room namespace")]
    WrongNamespace,

    /// Key is `Room:` with nothing after the separator
    #[error("room identifier is empty")]
    EmptyId,

    /// Key belongs to a room but is one of its derived keys
    #[error("key is a derived room key")]
    DerivedKey,
}

// == Result Type Alias ==
/// Convenience Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::Transport("reset".into()).is_transient());
        assert!(StoreError::Timeout("5s".into()).is_transient());
        assert!(!StoreError::Protocol("bad reply".into()).is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "Transport error: connection refused");
        assert_eq!(KeyParseError::EmptyId.to_string(), "room identifier is empty");
    }
}
