//! Contact-data synthesis: placeholder fax numbers and homepages for
//! suppliers and staged customers that lack them.
//!
//! The generated values come from `granary_core::contact` and are pure
//! functions of the record, so re-running the pass is a no-op for rows
//! already filled.

use granary_core::{
  contact::{placeholder_fax, placeholder_homepage},
  metric::{MetricResult, Severity},
  run::ContactStats,
};
use granary_store::{Warehouse, metrics::record_metric};
use rusqlite::{Connection, params};
use tracing::info;

use crate::Result;

pub fn synthesise_contacts(wh: &mut Warehouse, run_id: i64) -> Result<ContactStats> {
  let stats = wh.with_tx(|tx| {
    let mut stats = ContactStats::default();

    fill_fax(tx, run_id, "stg_suppliers", "CAST(supplier_id AS TEXT)", &mut stats)?;
    fill_fax(tx, run_id, "stg_customers_delta", "customer_id", &mut stats)?;
    fill_homepages(tx, run_id, &mut stats)?;

    record_metric(
      tx,
      run_id,
      "contacts_synthesised",
      "stg_suppliers,stg_customers_delta",
      &MetricResult::Count((stats.fax_generated + stats.homepage_generated) as i64),
      &format!(
        "fax={} homepage={}",
        stats.fax_generated, stats.homepage_generated
      ),
      Severity::Low,
    );
    Ok(stats)
  })?;

  info!(
    fax = stats.fax_generated,
    homepage = stats.homepage_generated,
    "contact synthesis complete"
  );
  Ok(stats)
}

fn fill_fax(
  tx: &Connection,
  run_id: i64,
  table: &str,
  key_expr: &str,
  stats: &mut ContactStats,
) -> granary_store::Result<()> {
  let sql = format!(
    "SELECT rowid, {key_expr}, country FROM {table}
      WHERE fax IS NULL OR fax = ''"
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

  for (rowid, key, country) in rows {
    let fax = placeholder_fax(country.as_deref());
    tx.execute(
      &format!("UPDATE {table} SET fax = ?1 WHERE rowid = ?2"),
      params![fax, rowid],
    )?;
    stats.fax_generated += 1;
    record_metric(
      tx,
      run_id,
      "fax_synthesised",
      &format!("{table}:{key}"),
      &MetricResult::Pass,
      &fax,
      Severity::Low,
    );
  }
  Ok(())
}

fn fill_homepages(
  tx: &Connection,
  run_id: i64,
  stats: &mut ContactStats,
) -> granary_store::Result<()> {
  let mut stmt = tx.prepare(
    "SELECT rowid, supplier_id, company_name FROM stg_suppliers
      WHERE home_page IS NULL OR home_page = ''",
  )?;
  let rows = stmt
    .query_map([], |row| {
      Ok((
        row.get::<_, i64>(0)?,
        row.get::<_, i64>(1)?,
        row.get::<_, String>(2)?,
      ))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  for (rowid, supplier_id, company_name) in rows {
    let url = placeholder_homepage(&company_name, &supplier_id.to_string());
    tx.execute(
      "UPDATE stg_suppliers SET home_page = ?1 WHERE rowid = ?2",
      params![url, rowid],
    )?;
    stats.homepage_generated += 1;
    record_metric(
      tx,
      run_id,
      "homepage_synthesised",
      &format!("stg_suppliers:{supplier_id}"),
      &MetricResult::Pass,
      &url,
      Severity::Low,
    );
  }
  Ok(())
}
