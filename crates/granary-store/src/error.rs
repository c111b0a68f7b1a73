//! Error type for `granary-store`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] granary_core::Error),

  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),

  #[error("date parse error: {0}")]
  DateParse(String),

  /// A precondition required this table to exist.
  #[error("required table is missing: {0}")]
  MissingTable(String),

  #[error("run not found in the execution ledger: {0}")]
  RunNotFound(i64),

  #[error("retry budget exhausted after {attempts} attempts: {source}")]
  RetryExhausted {
    attempts: u32,
    source:   rusqlite::Error,
  },
}

impl Error {
  /// True for transient storage contention (lock/busy) that a backoff-retry
  /// can resolve. Constraint violations and malformed SQL are permanent.
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Database(e) => sqlite_busy(e),
      _ => false,
    }
  }
}

/// Lock contention as SQLite reports it.
pub fn sqlite_busy(e: &rusqlite::Error) -> bool {
  matches!(
    e.sqlite_error_code(),
    Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
  )
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
