//! Run states and per-phase statistics.
//!
//! Every component operation returns a stats struct on success; the
//! orchestrator folds them into a [`BatchSummary`] that is serialised to JSON
//! and stored as the run's ledger comment.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Run state ───────────────────────────────────────────────────────────────

/// Terminal (and in-flight) state of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunState {
  InProgress,
  Success,
  /// Completed with postcondition warnings; completed work is kept.
  Partial,
  Failed,
}

impl RunState {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::InProgress => "IN_PROGRESS",
      Self::Success => "SUCCESS",
      Self::Partial => "PARTIAL",
      Self::Failed => "FAILED",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "IN_PROGRESS" => Ok(Self::InProgress),
      "SUCCESS" => Ok(Self::Success),
      "PARTIAL" => Ok(Self::Partial),
      "FAILED" => Ok(Self::Failed),
      other => Err(Error::UnknownRunState(other.to_owned())),
    }
  }
}

// ─── Remediation stats ───────────────────────────────────────────────────────

/// Temporal-logic fix: `valid_from > valid_to` inversions healed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TemporalStats {
  pub detected: u64,
  pub fixed:    u64,
}

/// Region inference, broken down by the rung of the ladder that resolved
/// each row.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RegionStats {
  pub detected:    u64,
  pub direct:      u64,
  pub fuzzy:       u64,
  pub world_stats: u64,
  pub fallback:    u64,
}

impl RegionStats {
  pub fn fixed(&self) -> u64 {
    self.direct + self.fuzzy + self.world_stats + self.fallback
  }
}

/// Shipping-attribute inheritance and flagging.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ShippingStats {
  pub scanned:           u64,
  pub region_inherited:  u64,
  pub postal_inherited:  u64,
  /// Orders with a null shipped date — classified, not repaired.
  pub pending_shipments: u64,
  /// Fields left null because the owning customer had no value either.
  pub unresolved:        u64,
  /// Ship regions filled by the bulk propagation pass.
  pub regions_propagated: u64,
}

/// Contact-data synthesis.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ContactStats {
  pub fax_generated:      u64,
  pub homepage_generated: u64,
}

/// Statistical enrichment of the country-statistics reference table.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EnrichmentStats {
  pub wages_estimated: u64,
}

/// Consolidated report across every remediation pass of one run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RemediationReport {
  pub temporal:   TemporalStats,
  pub region:     RegionStats,
  pub shipping:   ShippingStats,
  pub contact:    ContactStats,
  pub enrichment: EnrichmentStats,
}

impl RemediationReport {
  pub fn total_fixes(&self) -> u64 {
    self.temporal.fixed
      + self.region.fixed()
      + self.shipping.region_inherited
      + self.shipping.postal_inherited
      + self.shipping.regions_propagated
      + self.contact.fax_generated
      + self.contact.homepage_generated
      + self.enrichment.wages_estimated
  }
}

// ─── Reconciler stats ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Scd2Stats {
  pub changed:   u64,
  pub new:       u64,
  pub unchanged: u64,
  /// Delta rows dropped by last-row-wins deduplication.
  pub duplicates_dropped: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FactStats {
  pub updated:  u64,
  pub inserted: u64,
  /// Lines skipped because a required dimension lookup missed.
  pub skipped_unresolved: u64,
  /// Inserted rows with a null geography key (known degradation).
  pub null_geography: u64,
  /// Inserted rows with a null shipper key (known degradation).
  pub null_shipper: u64,
}

// ─── Batch summary ───────────────────────────────────────────────────────────

/// One record per orchestrator run; serialised to JSON for the ledger
/// comment and the CLI report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
  pub run_id:      i64,
  pub batch_date:  NaiveDate,
  pub state:       RunState,
  /// None when the precondition check skipped the batch (empty delta).
  pub remediation: Option<RemediationReport>,
  pub scd2:        Option<Scd2Stats>,
  pub facts:       Option<FactStats>,
  pub postcondition_warnings: u64,
  pub comment:     String,
}

impl BatchSummary {
  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string(self)?)
  }
}
