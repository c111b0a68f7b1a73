//! Temporal-logic fix: heal `valid_from > valid_to` inversions in the
//! customer dimension.
//!
//! An inverted window is assumed to be a data-entry defect in `valid_to`, so
//! the repair assigns the shortest well-formed window: one day. The original
//! `valid_from` is trusted.

use granary_core::{
  metric::{MetricResult, Severity},
  run::TemporalStats,
};
use granary_store::{Warehouse, metrics::record_metric};
use rusqlite::params;
use tracing::info;

use crate::Result;

pub fn fix_inversions(wh: &mut Warehouse, run_id: i64) -> Result<TemporalStats> {
  let stats = wh.with_tx(|tx| {
    let mut stmt = tx.prepare(
      "SELECT sk_customer, nk_customer_id, valid_from, valid_to
         FROM dim_customer
        WHERE valid_to IS NOT NULL AND valid_from > valid_to",
    )?;
    let inverted = stmt
      .query_map([], |row| {
        Ok((
          row.get::<_, i64>(0)?,
          row.get::<_, String>(1)?,
          row.get::<_, String>(2)?,
          row.get::<_, String>(3)?,
        ))
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stats = TemporalStats {
      detected: inverted.len() as u64,
      fixed:    0,
    };
    for (sk, nk, from, to) in &inverted {
      tx.execute(
        "UPDATE dim_customer
            SET valid_to = date(valid_from, '+1 day')
          WHERE sk_customer = ?1",
        params![sk],
      )?;
      stats.fixed += 1;
      record_metric(
        tx,
        run_id,
        "temporal_inversion_fixed",
        &format!("dim_customer:{nk}"),
        &MetricResult::Pass,
        &format!("valid_to {to} < valid_from {from}; window reset to one day"),
        Severity::Medium,
      );
    }

    record_metric(
      tx,
      run_id,
      "temporal_inversions",
      "dim_customer",
      &MetricResult::Count(stats.detected as i64),
      "",
      Severity::Low,
    );
    Ok(stats)
  })?;

  info!(detected = stats.detected, fixed = stats.fixed, "temporal fix complete");
  Ok(stats)
}
