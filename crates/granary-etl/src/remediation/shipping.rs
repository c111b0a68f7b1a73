//! Shipping-attribute inheritance for staged orders.
//!
//! Missing ship region / postal code is copied from the owning customer —
//! the current dimension version first, the staged delta second. A field is
//! only ever filled from a real customer value; when the customer has none
//! either, the field stays NULL and the gap is flagged. A missing shipped
//! date is a business state (the order has not shipped), so it is classified
//! and reported, never filled.

use granary_core::{
  metric::{MetricResult, Severity},
  run::ShippingStats,
};
use granary_store::{Warehouse, metrics::record_metric};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use crate::Result;

pub fn inherit_shipping_attrs(wh: &mut Warehouse, run_id: i64) -> Result<ShippingStats> {
  let stats = wh.with_tx(|tx| {
    let mut stmt = tx.prepare(
      "SELECT rowid, order_id, customer_id, ship_region, ship_postal_code,
              shipped_date
         FROM stg_orders_delta
        WHERE ship_region IS NULL
           OR ship_postal_code IS NULL
           OR shipped_date IS NULL",
    )?;
    let rows = stmt
      .query_map([], |row| {
        Ok((
          row.get::<_, i64>(0)?,
          row.get::<_, i64>(1)?,
          row.get::<_, Option<String>>(2)?,
          row.get::<_, Option<String>>(3)?,
          row.get::<_, Option<String>>(4)?,
          row.get::<_, Option<String>>(5)?,
        ))
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stats = ShippingStats {
      scanned: rows.len() as u64,
      ..ShippingStats::default()
    };

    for (rowid, order_id, customer_id, ship_region, ship_postal, shipped_date) in rows {
      let owner = match customer_id.as_deref() {
        Some(id) => customer_attrs(tx, id)?,
        None => None,
      };

      if ship_region.is_none() {
        match owner.as_ref().and_then(|o| o.region.clone()) {
          Some(region) => {
            tx.execute(
              "UPDATE stg_orders_delta SET ship_region = ?1 WHERE rowid = ?2",
              params![region, rowid],
            )?;
            stats.region_inherited += 1;
            record_metric(
              tx,
              run_id,
              "ship_region_inherited",
              &format!("stg_orders_delta:{order_id}"),
              &MetricResult::Pass,
              &format!("inherited '{region}' from customer"),
              Severity::Low,
            );
          }
          None => stats.unresolved += 1,
        }
      }

      if ship_postal.is_none() {
        match owner.as_ref().and_then(|o| o.postal_code.clone()) {
          Some(postal) => {
            tx.execute(
              "UPDATE stg_orders_delta SET ship_postal_code = ?1 WHERE rowid = ?2",
              params![postal, rowid],
            )?;
            stats.postal_inherited += 1;
            record_metric(
              tx,
              run_id,
              "ship_postal_inherited",
              &format!("stg_orders_delta:{order_id}"),
              &MetricResult::Pass,
              "inherited postal code from customer",
              Severity::Low,
            );
          }
          None => stats.unresolved += 1,
        }
      }

      if shipped_date.is_none() {
        stats.pending_shipments += 1;
        record_metric(
          tx,
          run_id,
          "pending_shipment",
          &format!("stg_orders_delta:{order_id}"),
          &MetricResult::Warning,
          "no shipped date; order not yet shipped",
          Severity::Low,
        );
      }
    }

    record_metric(
      tx,
      run_id,
      "shipping_gaps_unresolved",
      "stg_orders_delta",
      &MetricResult::Count(stats.unresolved as i64),
      "fields left NULL because the owning customer had no value",
      Severity::Medium,
    );
    Ok(stats)
  })?;

  info!(
    scanned = stats.scanned,
    region = stats.region_inherited,
    postal = stats.postal_inherited,
    pending = stats.pending_shipments,
    "shipping inheritance complete"
  );
  Ok(stats)
}

/// Final bulk pass: any ship region still NULL after inheritance and region
/// inference is copied from the customer's now-resolved region in one
/// statement.
pub fn propagate_ship_regions(wh: &mut Warehouse, run_id: i64) -> Result<u64> {
  let propagated = wh.with_tx(|tx| {
    let n = tx.execute(
      "UPDATE stg_orders_delta
          SET ship_region = (
                SELECT c.region FROM dim_customer c
                 WHERE c.nk_customer_id = stg_orders_delta.customer_id
                   AND c.is_current = 1
              )
        WHERE ship_region IS NULL
          AND customer_id IS NOT NULL
          AND (
                SELECT c.region FROM dim_customer c
                 WHERE c.nk_customer_id = stg_orders_delta.customer_id
                   AND c.is_current = 1
              ) IS NOT NULL",
      [],
    )?;
    record_metric(
      tx,
      run_id,
      "ship_regions_propagated",
      "stg_orders_delta",
      &MetricResult::Count(n as i64),
      "bulk copy from resolved customer regions",
      Severity::Low,
    );
    Ok(n as u64)
  })?;

  info!(propagated, "ship-region propagation complete");
  Ok(propagated)
}

struct OwnerAttrs {
  region:      Option<String>,
  postal_code: Option<String>,
}

/// The owning customer's inheritable attributes: current dimension version
/// first, staged delta as a fallback for customers not yet reconciled.
fn customer_attrs(tx: &Connection, customer_id: &str) -> granary_store::Result<Option<OwnerAttrs>> {
  let from_dim = tx
    .query_row(
      "SELECT region, postal_code FROM dim_customer
        WHERE nk_customer_id = ?1 AND is_current = 1",
      params![customer_id],
      |row| {
        Ok(OwnerAttrs {
          region:      row.get(0)?,
          postal_code: row.get(1)?,
        })
      },
    )
    .optional()?;
  if from_dim.is_some() {
    return Ok(from_dim);
  }

  Ok(
    tx.query_row(
      "SELECT region, postal_code FROM stg_customers_delta
        WHERE customer_id = ?1",
      params![customer_id],
      |row| {
        Ok(OwnerAttrs {
          region:      row.get(0)?,
          postal_code: row.get(1)?,
        })
      },
    )
    .optional()?,
  )
}
