//! Region inference: fill NULL/empty region columns across the staged and
//! dimensional tables.
//!
//! The ladder is strict priority order and short-circuits on the first hit:
//! direct lookup in the compiled-in country table, fuzzy substring match
//! against the same table, cross-reference through the world-statistics
//! staging table (catches rows whose country column actually holds a city
//! name), and finally the configured fallback label. The rung that resolved
//! each row is written to the detail metric so synthesised attributions stay
//! auditable.

use granary_core::{
  metric::{MetricResult, Severity},
  region::{InferenceMethod, RegionResolver},
  run::RegionStats,
};
use granary_store::{Warehouse, metrics::record_metric};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use crate::Result;

/// A (table, key, country, region) column quadruple to scan. The key column
/// is only used to label detail metrics.
struct ScanTarget {
  table:      &'static str,
  key_col:    &'static str,
  region_col: &'static str,
  filter:     &'static str,
}

const SCAN_TARGETS: &[ScanTarget] = &[
  ScanTarget {
    table:      "stg_customers_delta",
    key_col:    "customer_id",
    region_col: "region",
    filter:     "",
  },
  ScanTarget {
    table:      "stg_suppliers",
    key_col:    "supplier_id",
    region_col: "region",
    filter:     "",
  },
  ScanTarget {
    table:      "dim_employee",
    key_col:    "nk_employee_id",
    region_col: "region",
    filter:     "",
  },
  // Mirror of the customer-delta scan onto the live dimension, current
  // versions only. Historical rows keep whatever they recorded.
  ScanTarget {
    table:      "dim_customer",
    key_col:    "nk_customer_id",
    region_col: "region",
    filter:     "AND is_current = 1",
  },
];

pub fn infer_regions(
  wh: &mut Warehouse,
  run_id: i64,
  resolver: &dyn RegionResolver,
  fallback: &str,
) -> Result<RegionStats> {
  let stats = wh.with_tx(|tx| {
    let mut stats = RegionStats::default();
    for target in SCAN_TARGETS {
      scan_target(tx, run_id, target, resolver, fallback, &mut stats)?;
    }
    record_metric(
      tx,
      run_id,
      "regions_inferred",
      "all_scanned_tables",
      &MetricResult::Count(stats.fixed() as i64),
      &format!(
        "direct={} fuzzy={} world_stats={} fallback={}",
        stats.direct, stats.fuzzy, stats.world_stats, stats.fallback
      ),
      Severity::Low,
    );
    Ok(stats)
  })?;

  info!(
    detected = stats.detected,
    fixed = stats.fixed(),
    "region inference complete"
  );
  Ok(stats)
}

fn scan_target(
  tx: &Connection,
  run_id: i64,
  target: &ScanTarget,
  resolver: &dyn RegionResolver,
  fallback: &str,
  stats: &mut RegionStats,
) -> granary_store::Result<()> {
  let sql = format!(
    "SELECT rowid, CAST({key} AS TEXT), country
       FROM {table}
      WHERE ({region} IS NULL OR {region} = '') {filter}",
    key = target.key_col,
    table = target.table,
    region = target.region_col,
    filter = target.filter,
  );
  let mut stmt = tx.prepare(&sql)?;
  let rows = stmt
    .query_map([], |row| {
      Ok((
        row.get::<_, i64>(0)?,
        row.get::<_, String>(1)?,
        row.get::<_, Option<String>>(2)?,
      ))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  stats.detected += rows.len() as u64;
  for (rowid, key, country) in rows {
    let (region, method) = infer(tx, resolver, country.as_deref(), fallback)?;
    tx.execute(
      &format!(
        "UPDATE {table} SET {region_col} = ?1 WHERE rowid = ?2",
        table = target.table,
        region_col = target.region_col,
      ),
      params![region, rowid],
    )?;
    match method {
      InferenceMethod::DirectMapping => stats.direct += 1,
      InferenceMethod::FuzzyMatch => stats.fuzzy += 1,
      InferenceMethod::WorldStats => stats.world_stats += 1,
      InferenceMethod::Fallback => stats.fallback += 1,
    }
    record_metric(
      tx,
      run_id,
      "region_inferred",
      &format!("{}:{key}", target.table),
      &MetricResult::Pass,
      &format!(
        "region '{region}' via {} (country {:?})",
        method.as_str(),
        country.as_deref().unwrap_or("<null>")
      ),
      Severity::Low,
    );
  }
  Ok(())
}

/// Walk the ladder for one row.
fn infer(
  tx: &Connection,
  resolver: &dyn RegionResolver,
  country: Option<&str>,
  fallback: &str,
) -> granary_store::Result<(String, InferenceMethod)> {
  let Some(country) = country.filter(|c| !c.is_empty()) else {
    return Ok((fallback.to_owned(), InferenceMethod::Fallback));
  };

  if let Some(region) = resolver.lookup(country) {
    return Ok((region.to_owned(), InferenceMethod::DirectMapping));
  }
  if let Some(region) = resolver.lookup_fuzzy(country) {
    return Ok((region.to_owned(), InferenceMethod::FuzzyMatch));
  }
  if let Some(region) = world_stats_lookup(tx, resolver, country)? {
    return Ok((region, InferenceMethod::WorldStats));
  }
  Ok((fallback.to_owned(), InferenceMethod::Fallback))
}

/// Rung 3: find a canonical country name in the world-statistics table whose
/// name or largest city matches the query, then map the canonical name
/// through the resolver.
fn world_stats_lookup(
  tx: &Connection,
  resolver: &dyn RegionResolver,
  country: &str,
) -> granary_store::Result<Option<String>> {
  let canonical: Option<String> = tx
    .query_row(
      "SELECT country FROM stg_world_stats
        WHERE UPPER(country) LIKE '%' || UPPER(?1) || '%'
           OR UPPER(?1) LIKE '%' || UPPER(country) || '%'
           OR UPPER(largest_city) = UPPER(?1)
        LIMIT 1",
      params![country],
      |row| row.get(0),
    )
    .optional()?;

  Ok(canonical.and_then(|name| {
    resolver
      .lookup(&name)
      .or_else(|| resolver.lookup_fuzzy(&name))
      .map(str::to_owned)
  }))
}
