//! The data-quality remediation engine.
//!
//! A fixed sequence of independent, idempotent fixers, each running inside
//! its own retried transaction. Every fixer emits one detail metric per fix
//! and one summary metric for its defect class; [`run_all`] finishes with a
//! validation sweep and a consolidated JSON report.

mod contact;
mod enrich;
mod region;
mod shipping;
mod temporal;

pub use contact::synthesise_contacts;
pub use enrich::estimate_minimum_wages;
pub use region::infer_regions;
pub use shipping::{inherit_shipping_attrs, propagate_ship_regions};
pub use temporal::fix_inversions;

use granary_core::{
  metric::{MetricResult, Severity},
  region::RegionResolver,
  run::RemediationReport,
};
use granary_store::{Warehouse, metrics::record_metric};
use tracing::{info, warn};

use crate::Result;

/// Run every fixer in order and validate the outcome.
///
/// Order matters only at the edges: region inference must precede the bulk
/// ship-region propagation, which reads the resolved customer regions.
pub fn run_all(
  wh: &mut Warehouse,
  run_id: i64,
  resolver: &dyn RegionResolver,
  region_fallback: &str,
) -> Result<RemediationReport> {
  let mut report = RemediationReport {
    temporal: fix_inversions(wh, run_id)?,
    region: infer_regions(wh, run_id, resolver, region_fallback)?,
    shipping: inherit_shipping_attrs(wh, run_id)?,
    contact: synthesise_contacts(wh, run_id)?,
    enrichment: estimate_minimum_wages(wh, run_id)?,
  };
  report.shipping.regions_propagated = propagate_ship_regions(wh, run_id)?;

  validate(wh, run_id)?;

  let detail = serde_json::to_string(&report).map_err(granary_core::Error::from)?;
  record_metric(
    wh.conn(),
    run_id,
    "remediation_summary",
    "warehouse",
    &MetricResult::Count(report.total_fixes() as i64),
    &detail,
    Severity::Low,
  );
  info!(total_fixes = report.total_fixes(), "remediation complete");
  Ok(report)
}

/// Post-remediation sweep: the defect classes the fixers target must be
/// gone. Failures here are reported, not fatal — the orchestrator's
/// postcondition check decides the run state.
fn validate(wh: &mut Warehouse, run_id: i64) -> Result<()> {
  let conn = wh.conn();

  let inversions: i64 = conn.query_row(
    "SELECT COUNT(*) FROM dim_customer
      WHERE valid_to IS NOT NULL AND valid_from > valid_to",
    [],
    |row| row.get(0),
  )?;
  record_metric(
    conn,
    run_id,
    "temporal_inversions_remaining",
    "dim_customer",
    if inversions == 0 { &MetricResult::Pass } else { &MetricResult::Fail },
    &inversions.to_string(),
    Severity::High,
  );

  // Every table the region scan targets, current dimension rows included.
  for (table, filter) in [
    ("stg_customers_delta", ""),
    ("stg_suppliers", ""),
    ("dim_employee", ""),
    ("dim_customer", "AND is_current = 1"),
  ] {
    let nulls: i64 = conn.query_row(
      &format!(
        "SELECT COUNT(*) FROM {table}
          WHERE (region IS NULL OR region = '') {filter}"
      ),
      [],
      |row| row.get(0),
    )?;
    record_metric(
      conn,
      run_id,
      "null_regions_remaining",
      table,
      if nulls == 0 { &MetricResult::Pass } else { &MetricResult::Fail },
      &nulls.to_string(),
      Severity::Medium,
    );
    if nulls > 0 {
      warn!(table, nulls, "null regions survived remediation");
    }
  }

  let ship_nulls: i64 = conn.query_row(
    "SELECT COUNT(*) FROM stg_orders_delta
      WHERE ship_region IS NULL OR ship_postal_code IS NULL",
    [],
    |row| row.get(0),
  )?;
  record_metric(
    conn,
    run_id,
    "shipping_nulls_remaining",
    "stg_orders_delta",
    &MetricResult::Count(ship_nulls),
    "known gaps where no customer value existed to inherit",
    Severity::Low,
  );

  Ok(())
}
