use granary_core::{
  metric::{MetricResult, Severity},
  run::RunState,
};
use rusqlite::params;

use crate::{
  metrics::{end_run, fetch_run, record_metric, start_run},
  retry::{with_retry, RetryPolicy},
  Error, Warehouse,
};

fn warehouse() -> Warehouse {
  Warehouse::open_in_memory().expect("in-memory warehouse")
}

#[test]
fn schema_applies_and_is_idempotent() {
  let wh = warehouse();
  for table in [
    "dim_customer",
    "dim_product",
    "dim_employee",
    "dim_date",
    "dim_geography",
    "dim_shipper",
    "fact_sales",
    "stg_customers_delta",
    "stg_orders_delta",
    "stg_order_details_delta",
    "stg_suppliers",
    "stg_world_stats",
    "dqm_process_runs",
    "dqm_quality_indicators",
  ] {
    assert!(wh.table_exists(table).unwrap(), "missing table {table}");
  }
  // Re-running the DDL must not fail.
  wh.conn().execute_batch(crate::schema::SCHEMA).unwrap();
}

#[test]
fn row_count_rejects_unknown_table() {
  let wh = warehouse();
  assert_eq!(wh.row_count("dim_customer").unwrap(), 0);
  assert!(matches!(
    wh.row_count("no_such_table"),
    Err(Error::MissingTable(_))
  ));
}

#[test]
fn with_tx_commits_on_ok() {
  let mut wh = warehouse();
  wh.with_tx(|tx| {
    tx.execute(
      "INSERT INTO stg_world_stats (country, gdp) VALUES ('Norway', 82000.0)",
      [],
    )?;
    Ok(())
  })
  .unwrap();
  assert_eq!(wh.row_count("stg_world_stats").unwrap(), 1);
}

#[test]
fn with_tx_rolls_back_on_err() {
  let mut wh = warehouse();
  let result: crate::Result<()> = wh.with_tx(|tx| {
    tx.execute(
      "INSERT INTO stg_world_stats (country, gdp) VALUES ('Norway', 82000.0)",
      [],
    )?;
    Err(Error::MissingTable("forced".into()))
  });
  assert!(result.is_err());
  assert_eq!(wh.row_count("stg_world_stats").unwrap(), 0);
}

#[test]
fn ledger_records_start_and_end() {
  let wh = warehouse();
  let run_id = start_run(wh.conn(), "granary_batch").unwrap();
  end_run(wh.conn(), run_id, RunState::Success, "all clear").unwrap();

  let record = fetch_run(wh.conn(), run_id).unwrap();
  assert_eq!(record.process_name, "granary_batch");
  assert_eq!(record.state, RunState::Success);
  assert_eq!(record.comment.as_deref(), Some("all clear"));
  assert!(record.duration_secs.unwrap() >= 0.0);
}

#[test]
fn end_run_requires_existing_entry() {
  let wh = warehouse();
  assert!(matches!(
    end_run(wh.conn(), 999, RunState::Failed, ""),
    Err(Error::RunNotFound(999))
  ));
}

#[test]
fn metric_sink_writes_observation() {
  let wh = warehouse();
  let run_id = start_run(wh.conn(), "granary_batch").unwrap();
  record_metric(
    wh.conn(),
    run_id,
    "scd2_single_current",
    "dim_customer",
    &MetricResult::Pass,
    "",
    Severity::High,
  );
  record_metric(
    wh.conn(),
    run_id,
    "rows_reconciled",
    "fact_sales",
    &MetricResult::Count(42),
    "",
    Severity::Low,
  );

  let (result, severity): (String, String) = wh
    .conn()
    .query_row(
      "SELECT result, severity FROM dqm_quality_indicators
        WHERE indicator_name = 'scd2_single_current'",
      [],
      |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .unwrap();
  assert_eq!(result, "PASS");
  assert_eq!(severity, "HIGH");

  let count: String = wh
    .conn()
    .query_row(
      "SELECT result FROM dqm_quality_indicators
        WHERE indicator_name = 'rows_reconciled'",
      [],
      |row| row.get(0),
    )
    .unwrap();
  assert_eq!(count, "42");
}

#[test]
fn metric_sink_swallows_storage_failures() {
  let wh = warehouse();
  // No ledger entry exists, so the FK on run_id rejects the insert. The
  // sink must not panic or surface the error.
  record_metric(
    wh.conn(),
    12345,
    "orphan",
    "nowhere",
    &MetricResult::Error,
    "",
    Severity::Low,
  );
  assert_eq!(wh.row_count("dqm_quality_indicators").unwrap(), 0);
}

#[test]
fn retry_propagates_permanent_errors_immediately() {
  let policy = RetryPolicy::default();
  let mut calls = 0u32;
  let result: crate::Result<()> = with_retry(&policy, || {
    calls += 1;
    Err(Error::MissingTable("stg_orders_delta".into()))
  });
  assert!(result.is_err());
  assert_eq!(calls, 1);
}

#[test]
fn retry_delay_is_capped() {
  let policy = RetryPolicy {
    max_attempts:  5,
    base_delay_ms: 100,
    max_delay_ms:  400,
  };
  let delay = policy.delay_for_attempt(10);
  // cap + max 25% jitter
  assert!(delay.as_millis() <= 500);
}

#[test]
fn busy_classification_only_covers_lock_contention() {
  let wh = warehouse();
  // Constraint violation is permanent.
  let run_err = wh
    .conn()
    .execute(
      "INSERT INTO dqm_quality_indicators
         (run_id, indicator_name, entity, result) VALUES (1, 'x', 'y', 'PASS')",
      params![],
    )
    .unwrap_err();
  assert!(!Error::Database(run_err).is_retryable());
}
