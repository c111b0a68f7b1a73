//! Vocabulary for the data-quality mart: metric results and severities.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Result ──────────────────────────────────────────────────────────────────

/// The outcome column of a quality indicator. Count-style indicators store
/// the number as its decimal string, matching the text column in the mart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricResult {
  Pass,
  Warning,
  Fail,
  Error,
  /// A raw numeric observation, e.g. a record count.
  Count(i64),
}

impl fmt::Display for MetricResult {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Pass => f.write_str("PASS"),
      Self::Warning => f.write_str("WARNING"),
      Self::Fail => f.write_str("FAIL"),
      Self::Error => f.write_str("ERROR"),
      Self::Count(n) => write!(f, "{n}"),
    }
  }
}

// ─── Severity ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
  #[default]
  Low,
  Medium,
  High,
  Critical,
}

impl Severity {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Low => "LOW",
      Self::Medium => "MEDIUM",
      Self::High => "HIGH",
      Self::Critical => "CRITICAL",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "LOW" => Ok(Self::Low),
      "MEDIUM" => Ok(Self::Medium),
      "HIGH" => Ok(Self::High),
      "CRITICAL" => Ok(Self::Critical),
      other => Err(Error::UnknownSeverity(other.to_owned())),
    }
  }
}
