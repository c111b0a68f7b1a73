//! The incremental-update orchestrator.
//!
//! A linear state machine: precondition check, remediation, customer
//! reconciliation, fact reconciliation, postcondition check. Any error
//! escaping a phase is caught at this boundary, logged, and recorded as a
//! FAILED run — the ledger always receives exactly one terminal record per
//! invocation, and completed phases are never rolled back.

use chrono::{NaiveDate, Utc};
use granary_core::{
  metric::{MetricResult, Severity},
  region::{DEFAULT_REGION_FALLBACK, StaticRegionTable},
  run::{BatchSummary, RunState},
  sales::UnresolvedDimensionPolicy,
};
use granary_store::{
  Warehouse,
  metrics::{end_run, record_metric, start_run},
};
use tracing::{error, info, warn};

use crate::{
  Result, facts, remediation,
  scd2,
  validate::{self, Precondition},
};

/// Ledger name under which batches are recorded.
pub const PROCESS_NAME: &str = "granary_incremental_update";

#[derive(Debug, Clone)]
pub struct BatchOptions {
  /// Validity boundary for SCD2 versioning; today's date when not overridden.
  pub batch_date:        NaiveDate,
  pub unresolved_policy: UnresolvedDimensionPolicy,
  /// Label assigned when region inference exhausts every rung.
  pub region_fallback:   String,
}

impl Default for BatchOptions {
  fn default() -> Self {
    Self {
      batch_date:        Utc::now().date_naive(),
      unresolved_policy: UnresolvedDimensionPolicy::default(),
      region_fallback:   DEFAULT_REGION_FALLBACK.to_owned(),
    }
  }
}

/// Run one batch end to end and return its summary. Phase errors are folded
/// into a FAILED summary; an `Err` here means even the ledger could not be
/// written.
pub fn run_batch(wh: &mut Warehouse, opts: &BatchOptions) -> Result<BatchSummary> {
  let run_id = start_run(wh.conn(), PROCESS_NAME)?;
  info!(run_id, batch_date = %opts.batch_date, "batch started");

  let mut summary = BatchSummary {
    run_id,
    batch_date: opts.batch_date,
    state: RunState::InProgress,
    remediation: None,
    scd2: None,
    facts: None,
    postcondition_warnings: 0,
    comment: String::new(),
  };

  match execute_phases(wh, run_id, opts, &mut summary) {
    Ok(()) => {}
    Err(err) => {
      error!(run_id, error = %err, "batch failed");
      summary.state = RunState::Failed;
      summary.comment = err.to_string();
    }
  }

  finalise(wh, run_id, &summary)?;

  // Maintenance after the terminal transition; a failure here must not
  // change the recorded outcome.
  if let Err(err) = wh.maintain() {
    warn!(error = %err, "post-batch maintenance failed");
  }

  info!(run_id, state = summary.state.as_str(), "batch finished");
  Ok(summary)
}

fn execute_phases(
  wh: &mut Warehouse,
  run_id: i64,
  opts: &BatchOptions,
  summary: &mut BatchSummary,
) -> Result<()> {
  match validate::check_preconditions(wh, run_id)? {
    Precondition::EmptyDelta => {
      summary.state = RunState::Success;
      summary.comment = "empty delta; no-op batch".to_owned();
      return Ok(());
    }
    Precondition::Ready => {}
  }

  let resolver = StaticRegionTable;
  summary.remediation =
    Some(remediation::run_all(wh, run_id, &resolver, &opts.region_fallback)?);

  summary.scd2 = Some(scd2::reconcile_customers(wh, run_id, opts.batch_date)?);
  summary.facts = Some(facts::reconcile_sales(wh, run_id, opts.unresolved_policy)?);

  let outcome = validate::check_postconditions(wh, run_id)?;
  summary.postcondition_warnings = outcome.warnings;
  summary.state = if outcome.failures > 0 {
    summary.comment = format!("{} postcondition failure(s)", outcome.failures);
    RunState::Failed
  } else if outcome.warnings > 0 {
    summary.comment = format!("{} postcondition warning(s)", outcome.warnings);
    RunState::Partial
  } else {
    summary.comment = "all checks passed".to_owned();
    RunState::Success
  };
  Ok(())
}

/// Exactly one summary metric and one closed ledger record per run.
fn finalise(wh: &Warehouse, run_id: i64, summary: &BatchSummary) -> Result<()> {
  let detail = summary.to_json()?;
  record_metric(
    wh.conn(),
    run_id,
    "batch_summary",
    "warehouse",
    &match summary.state {
      RunState::Success => MetricResult::Pass,
      RunState::Partial => MetricResult::Warning,
      _ => MetricResult::Fail,
    },
    &detail,
    Severity::Low,
  );
  end_run(wh.conn(), run_id, summary.state, &detail)?;
  Ok(())
}
