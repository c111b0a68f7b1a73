//! Statistical enrichment of the world-statistics reference table: estimate
//! missing minimum wages from GDP per capita.
//!
//! Existing values are never overwritten. Rows without a GDP stay as they
//! are.

use granary_core::{
  metric::{MetricResult, Severity},
  run::EnrichmentStats,
};
use granary_store::{Warehouse, metrics::record_metric};
use rusqlite::params;
use tracing::info;

use crate::Result;

/// Piecewise wage estimate from GDP per capita.
fn estimated_wage(gdp: f64) -> f64 {
  if gdp > 50_000.0 {
    gdp * 0.0003
  } else if gdp > 20_000.0 {
    gdp * 0.0002
  } else if gdp > 5_000.0 {
    gdp * 0.0001
  } else {
    1.0
  }
}

pub fn estimate_minimum_wages(wh: &mut Warehouse, run_id: i64) -> Result<EnrichmentStats> {
  let stats = wh.with_tx(|tx| {
    let mut stmt = tx.prepare(
      "SELECT rowid, country, gdp FROM stg_world_stats
        WHERE minimum_wage IS NULL AND gdp IS NOT NULL",
    )?;
    let rows = stmt
      .query_map([], |row| {
        Ok((
          row.get::<_, i64>(0)?,
          row.get::<_, String>(1)?,
          row.get::<_, f64>(2)?,
        ))
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stats = EnrichmentStats::default();
    for (rowid, country, gdp) in rows {
      let wage = estimated_wage(gdp);
      tx.execute(
        "UPDATE stg_world_stats SET minimum_wage = ?1 WHERE rowid = ?2",
        params![wage, rowid],
      )?;
      stats.wages_estimated += 1;
      record_metric(
        tx,
        run_id,
        "minimum_wage_estimated",
        &format!("stg_world_stats:{country}"),
        &MetricResult::Pass,
        &format!("estimated {wage:.2} from gdp {gdp:.0}"),
        Severity::Low,
      );
    }

    record_metric(
      tx,
      run_id,
      "minimum_wages_estimated",
      "stg_world_stats",
      &MetricResult::Count(stats.wages_estimated as i64),
      "",
      Severity::Low,
    );
    Ok(stats)
  })?;

  info!(estimated = stats.wages_estimated, "wage estimation complete");
  Ok(stats)
}

#[cfg(test)]
mod tests {
  use super::estimated_wage;

  #[test]
  fn wage_brackets() {
    assert!((estimated_wage(80_000.0) - 24.0).abs() < 1e-9);
    assert!((estimated_wage(30_000.0) - 6.0).abs() < 1e-9);
    assert!((estimated_wage(10_000.0) - 1.0).abs() < 1e-9);
    assert!((estimated_wage(2_000.0) - 1.0).abs() < 1e-9);
  }
}
