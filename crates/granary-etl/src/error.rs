//! Error type for `granary-etl`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] granary_core::Error),

  #[error("store error: {0}")]
  Store(#[from] granary_store::Error),

  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
