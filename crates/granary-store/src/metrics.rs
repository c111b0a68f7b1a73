//! Quality-indicator sink and execution ledger.
//!
//! The sink deliberately never returns an error: a metric that cannot be
//! written must not take down the pipeline that produced it. Failures are
//! logged and dropped. The ledger, by contrast, is load-bearing and
//! propagates errors normally.

use chrono::Utc;
use granary_core::{
  metric::{MetricResult, Severity},
  run::RunState,
};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::warn;

use crate::{
  encode::{decode_dt, encode_dt},
  Error, Result,
};

// ─── Quality indicators ──────────────────────────────────────────────────────

/// Append one quality observation for `run_id`. Swallows storage errors.
pub fn record_metric(
  conn: &Connection,
  run_id: i64,
  indicator: &str,
  entity: &str,
  result: &MetricResult,
  detail: &str,
  severity: Severity,
) {
  let outcome = conn.execute(
    "INSERT INTO dqm_quality_indicators
       (run_id, indicator_name, entity, result, detail, severity)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    params![
      run_id,
      indicator,
      entity,
      result.to_string(),
      detail,
      severity.as_str()
    ],
  );
  if let Err(e) = outcome {
    warn!(indicator, entity, error = %e, "failed to record quality metric");
  }
}

// ─── Execution ledger ────────────────────────────────────────────────────────

/// A row from `dqm_process_runs`, as read back.
#[derive(Debug, Clone)]
pub struct RunRecord {
  pub run_id:        i64,
  pub process_name:  String,
  pub state:         RunState,
  pub duration_secs: Option<f64>,
  pub comment:       Option<String>,
}

/// Open a ledger entry in `IN_PROGRESS` state and return its id.
pub fn start_run(conn: &Connection, process_name: &str) -> Result<i64> {
  conn.execute(
    "INSERT INTO dqm_process_runs (process_name, started_at, state)
     VALUES (?1, ?2, ?3)",
    params![
      process_name,
      encode_dt(Utc::now()),
      RunState::InProgress.as_str()
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

/// Close a ledger entry: terminal state, finish timestamp, and the duration
/// computed against the stored start.
pub fn end_run(
  conn: &Connection,
  run_id: i64,
  state: RunState,
  comment: &str,
) -> Result<()> {
  let started_at: Option<String> = conn
    .query_row(
      "SELECT started_at FROM dqm_process_runs WHERE run_id = ?1",
      params![run_id],
      |row| row.get(0),
    )
    .optional()?;
  let Some(started_at) = started_at else {
    return Err(Error::RunNotFound(run_id));
  };

  let finished = Utc::now();
  let duration_secs = decode_dt(&started_at)
    .map(|started| (finished - started).num_milliseconds() as f64 / 1_000.0)
    .unwrap_or(0.0)
    .max(0.0);

  conn.execute(
    "UPDATE dqm_process_runs
        SET finished_at = ?1, state = ?2, duration_secs = ?3, comment = ?4
      WHERE run_id = ?5",
    params![
      encode_dt(finished),
      state.as_str(),
      duration_secs,
      comment,
      run_id
    ],
  )?;
  Ok(())
}

pub fn fetch_run(conn: &Connection, run_id: i64) -> Result<RunRecord> {
  conn
    .query_row(
      "SELECT run_id, process_name, state, duration_secs, comment
         FROM dqm_process_runs WHERE run_id = ?1",
      params![run_id],
      |row| {
        Ok((
          row.get::<_, i64>(0)?,
          row.get::<_, String>(1)?,
          row.get::<_, String>(2)?,
          row.get::<_, Option<f64>>(3)?,
          row.get::<_, Option<String>>(4)?,
        ))
      },
    )
    .optional()?
    .ok_or(Error::RunNotFound(run_id))
    .and_then(|(run_id, process_name, state, duration_secs, comment)| {
      Ok(RunRecord {
        run_id,
        process_name,
        state: RunState::parse(&state).map_err(Error::Core)?,
        duration_secs,
        comment,
      })
    })
}
