//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business failures (bad input,
/// conflicts, missing records). Transport concerns belong elsewhere; the
/// `Storage` variant is the one retryable kind and is never raised for a
/// partially applied write.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input failed validation before any write (e.g. missing reference
    /// number, empty goods list, malformed client payload).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A conflict occurred (duplicate reference number, duplicate client
    /// email/tax-id, illegal status transition). The enclosing transaction
    /// is aborted with no side effects.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A requested record was not found.
    #[error("not found")]
    NotFound,

    /// Role/ownership check failure.
    #[error("unauthorized")]
    Unauthorized,

    /// Transient storage failure (commit failure, poisoned lock). Safe to
    /// retry; never partially applied.
    #[error("transient storage failure: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
