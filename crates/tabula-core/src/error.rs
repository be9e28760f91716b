//! Typed errors shared across the workspace.

use thiserror::Error;

use crate::value::ColumnType;

/// Errors surfaced by query execution.
///
/// Everything here reaches the caller verbatim; no variant is ever
/// downgraded to an empty result set.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The predicate tree cannot be flattened into a form the
    /// translator understands.
    #[error("unsupported predicate: {reason}")]
    UnsupportedPredicate { reason: String },

    /// A literal's type disagrees with the column's declared type.
    /// Raised before any network call.
    #[error("type mismatch on column '{column}': expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        actual: String,
    },

    /// The queried table is not registered.
    #[error("unknown table: {table}")]
    UnknownTable { table: String },

    /// A projected or filtered column is not part of the table schema.
    #[error("unknown column: {column}")]
    UnknownColumn { column: String },

    /// The backing service answered with a non-2xx status, or the
    /// transport failed outright (in which case `status` is `None`).
    #[error("remote request failed (status {status:?}): {body}")]
    RemoteRequest { status: Option<u16>, body: String },

    /// The pagination loop hit its page cap without the service
    /// signalling the end of the result list.
    #[error("pagination limit exceeded after {pages} pages")]
    PaginationLimitExceeded { pages: u32 },

    /// The caller aborted the query via its cancellation token.
    #[error("query cancelled")]
    Cancelled,

    /// A native command string could not be parsed into a known command.
    #[error("unsupported command: {reason}")]
    UnsupportedCommand { reason: String },

    /// The remote response envelope or a record inside it was malformed.
    #[error("invalid record: {reason}")]
    InvalidRecord { reason: String },
}

impl QueryError {
    pub fn unsupported_predicate(reason: impl Into<String>) -> Self {
        QueryError::UnsupportedPredicate {
            reason: reason.into(),
        }
    }

    pub fn invalid_record(reason: impl Into<String>) -> Self {
        QueryError::InvalidRecord {
            reason: reason.into(),
        }
    }
}
