//! Error types for `granary-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown run state: {0:?}")]
  UnknownRunState(String),

  #[error("unknown severity: {0:?}")]
  UnknownSeverity(String),

  #[error("unknown inference method: {0:?}")]
  UnknownInferenceMethod(String),

  #[error("invalid date: {0}")]
  InvalidDate(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
