//! Pre- and postcondition checks for the incremental-update batch.
//!
//! Preconditions gate the run before any work starts. Postconditions belong
//! to the detect-and-report tier: they never roll back completed work, they
//! decide the terminal state.

use granary_core::metric::{MetricResult, Severity};
use granary_store::{Error as StoreError, Warehouse, metrics::record_metric};
use tracing::{error, warn};

use crate::Result;

/// Tables the ingestion collaborator must have created before a batch may
/// run.
const DELTA_TABLES: &[&str] = &[
  "stg_customers_delta",
  "stg_orders_delta",
  "stg_order_details_delta",
];

/// Outcome of the precondition gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
  /// Delta present; proceed.
  Ready,
  /// Staging exists but carries no rows: the batch is a warning no-op.
  EmptyDelta,
}

pub fn check_preconditions(wh: &Warehouse, run_id: i64) -> Result<Precondition> {
  for table in DELTA_TABLES {
    if !wh.table_exists(table)? {
      error!(table, "delta staging table missing");
      record_metric(
        wh.conn(),
        run_id,
        "precondition_staging_present",
        table,
        &MetricResult::Fail,
        "required delta staging table does not exist",
        Severity::Critical,
      );
      return Err(StoreError::MissingTable((*table).to_owned()).into());
    }
  }

  let mut total_rows = 0i64;
  for table in DELTA_TABLES {
    total_rows += wh.row_count(table)?;
  }
  if total_rows == 0 {
    warn!("delta staging is empty; batch is a no-op");
    record_metric(
      wh.conn(),
      run_id,
      "precondition_delta_nonempty",
      "staging",
      &MetricResult::Warning,
      "no delta rows staged; reconcilers skipped",
      Severity::Low,
    );
    return Ok(Precondition::EmptyDelta);
  }

  record_metric(
    wh.conn(),
    run_id,
    "precondition_staging_present",
    "staging",
    &MetricResult::Pass,
    &format!("{total_rows} delta rows staged"),
    Severity::Low,
  );
  Ok(Precondition::Ready)
}

// ─── Postconditions ──────────────────────────────────────────────────────────

/// What the postcondition sweep found. `failures` are invariant breaks that
/// fail the run; `warnings` demote it to partial.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostconditionOutcome {
  pub failures: u64,
  pub warnings: u64,
}

pub fn check_postconditions(wh: &Warehouse, run_id: i64) -> Result<PostconditionOutcome> {
  let conn = wh.conn();
  let mut outcome = PostconditionOutcome::default();

  // Exactly-one-current: no natural key may have two open versions.
  let multi_current: i64 = conn.query_row(
    "SELECT COUNT(*) FROM (
       SELECT nk_customer_id FROM dim_customer
        WHERE is_current = 1
        GROUP BY nk_customer_id
       HAVING COUNT(*) > 1
     )",
    [],
    |row| row.get(0),
  )?;
  report_invariant(
    wh,
    run_id,
    "scd2_single_current",
    "dim_customer",
    multi_current,
    &mut outcome.failures,
  );

  // No inverted validity window may survive remediation plus reconciliation.
  let inversions: i64 = conn.query_row(
    "SELECT COUNT(*) FROM dim_customer
      WHERE valid_to IS NOT NULL AND valid_from > valid_to",
    [],
    |row| row.get(0),
  )?;
  report_invariant(
    wh,
    run_id,
    "scd2_no_inversions",
    "dim_customer",
    inversions,
    &mut outcome.failures,
  );

  // Referential integrity of the fact table against each dimension. The
  // foreign keys enforce this online; the sweep guards against files
  // produced before enforcement was on.
  for (indicator, sql) in [
    (
      "fact_fk_customer",
      "SELECT COUNT(*) FROM fact_sales f
        WHERE NOT EXISTS (SELECT 1 FROM dim_customer d WHERE d.sk_customer = f.sk_customer)",
    ),
    (
      "fact_fk_product",
      "SELECT COUNT(*) FROM fact_sales f
        WHERE NOT EXISTS (SELECT 1 FROM dim_product d WHERE d.sk_product = f.sk_product)",
    ),
    (
      "fact_fk_employee",
      "SELECT COUNT(*) FROM fact_sales f
        WHERE NOT EXISTS (SELECT 1 FROM dim_employee d WHERE d.sk_employee = f.sk_employee)",
    ),
    (
      "fact_fk_date",
      "SELECT COUNT(*) FROM fact_sales f
        WHERE NOT EXISTS (SELECT 1 FROM dim_date d WHERE d.sk_date = f.sk_date)",
    ),
    (
      "fact_fk_geography",
      "SELECT COUNT(*) FROM fact_sales f
        WHERE f.sk_ship_geography IS NOT NULL AND NOT EXISTS
          (SELECT 1 FROM dim_geography d WHERE d.sk_geography = f.sk_ship_geography)",
    ),
    (
      "fact_fk_shipper",
      "SELECT COUNT(*) FROM fact_sales f
        WHERE f.sk_shipper IS NOT NULL AND NOT EXISTS
          (SELECT 1 FROM dim_shipper d WHERE d.sk_shipper = f.sk_shipper)",
    ),
  ] {
    let orphans: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    report_invariant(wh, run_id, indicator, "fact_sales", orphans, &mut outcome.failures);
  }

  // NULL optional keys are a known degradation; count and warn.
  for (indicator, column) in [
    ("fact_null_geography", "sk_ship_geography"),
    ("fact_null_shipper", "sk_shipper"),
  ] {
    let nulls: i64 = conn.query_row(
      &format!("SELECT COUNT(*) FROM fact_sales WHERE {column} IS NULL"),
      [],
      |row| row.get(0),
    )?;
    record_metric(
      conn,
      run_id,
      indicator,
      "fact_sales",
      if nulls == 0 { &MetricResult::Pass } else { &MetricResult::Warning },
      &nulls.to_string(),
      Severity::Low,
    );
    if nulls > 0 {
      outcome.warnings += nulls as u64;
    }
  }

  Ok(outcome)
}

fn report_invariant(
  wh: &Warehouse,
  run_id: i64,
  indicator: &str,
  entity: &str,
  violations: i64,
  failures: &mut u64,
) {
  if violations > 0 {
    error!(indicator, violations, "postcondition violated");
    *failures += violations as u64;
  }
  record_metric(
    wh.conn(),
    run_id,
    indicator,
    entity,
    if violations == 0 { &MetricResult::Pass } else { &MetricResult::Fail },
    &violations.to_string(),
    Severity::High,
  );
}
