//! Sales-fact reconciliation.
//!
//! One delta order line either updates the measures of an existing fact row
//! (matched on order id + product surrogate key) or inserts a new row after
//! resolving every dimension. An update never re-points dimension keys: the
//! keys recorded at first load describe the sale as it happened. The line
//! total is always recomputed from price, quantity, and discount.
//!
//! Runs after the customer reconciler, so the `is_current` lookup lands on
//! the version this batch just produced.

use granary_core::{
  metric::{MetricResult, Severity},
  run::FactStats,
  sales::{OrderLineDelta, UnresolvedDimensionPolicy, date_key, total_amount},
};
use granary_store::{Warehouse, decode_date, metrics::record_metric};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, warn};

use crate::Result;

pub fn reconcile_sales(
  wh: &mut Warehouse,
  run_id: i64,
  policy: UnresolvedDimensionPolicy,
) -> Result<FactStats> {
  let lines = load_delta_lines(wh.conn())?;

  let stats = wh.with_tx(|tx| {
    let mut stats = FactStats::default();
    for line in &lines {
      apply_line(tx, run_id, line, policy, &mut stats)?;
    }

    record_metric(
      tx,
      run_id,
      "facts_reconciled",
      "fact_sales",
      &MetricResult::Count((stats.updated + stats.inserted) as i64),
      &format!("updated={} inserted={}", stats.updated, stats.inserted),
      Severity::Low,
    );
    if stats.skipped_unresolved > 0 && policy == UnresolvedDimensionPolicy::Warn {
      record_metric(
        tx,
        run_id,
        "unresolved_dimension_skips",
        "fact_sales",
        &MetricResult::Warning,
        &format!(
          "{} delta lines skipped: required dimension lookup missed",
          stats.skipped_unresolved
        ),
        Severity::Medium,
      );
    }
    Ok(stats)
  })?;

  info!(
    updated = stats.updated,
    inserted = stats.inserted,
    skipped = stats.skipped_unresolved,
    "fact reconciliation complete"
  );
  Ok(stats)
}

fn apply_line(
  tx: &Connection,
  run_id: i64,
  line: &OrderLineDelta,
  policy: UnresolvedDimensionPolicy,
  stats: &mut FactStats,
) -> granary_store::Result<()> {
  let Some(sk_product) = lookup_i64(
    tx,
    "SELECT sk_product FROM dim_product WHERE nk_product_id = ?1",
    params![line.product_id],
  )?
  else {
    skip(tx, run_id, line, "product", policy, stats);
    return Ok(());
  };

  let total = total_amount(line.unit_price, line.quantity, line.discount);

  let existing = lookup_i64(
    tx,
    "SELECT sk_sale FROM fact_sales WHERE nk_order_id = ?1 AND sk_product = ?2",
    params![line.order_id, sk_product],
  )?;
  if let Some(sk_sale) = existing {
    tx.execute(
      "UPDATE fact_sales
          SET unit_price = ?1, quantity = ?2, discount = ?3, total_amount = ?4
        WHERE sk_sale = ?5",
      params![line.unit_price, line.quantity, line.discount, total, sk_sale],
    )?;
    stats.updated += 1;
    debug!(order_id = line.order_id, sk_product, "fact measures updated");
    return Ok(());
  }

  // New fact: every required dimension must resolve.
  let sk_customer = match &line.customer_id {
    Some(id) => lookup_i64(
      tx,
      "SELECT sk_customer FROM dim_customer
        WHERE nk_customer_id = ?1 AND is_current = 1",
      params![id],
    )?,
    None => None,
  };
  let Some(sk_customer) = sk_customer else {
    skip(tx, run_id, line, "customer", policy, stats);
    return Ok(());
  };

  let sk_employee = match line.employee_id {
    Some(id) => lookup_i64(
      tx,
      "SELECT sk_employee FROM dim_employee WHERE nk_employee_id = ?1",
      params![id],
    )?,
    None => None,
  };
  let Some(sk_employee) = sk_employee else {
    skip(tx, run_id, line, "employee", policy, stats);
    return Ok(());
  };

  let sk_date = match line.order_date {
    Some(date) => lookup_i64(
      tx,
      "SELECT sk_date FROM dim_date WHERE sk_date = ?1",
      params![date_key(date)],
    )?,
    None => None,
  };
  let Some(sk_date) = sk_date else {
    skip(tx, run_id, line, "date", policy, stats);
    return Ok(());
  };

  // Optional keys: a miss degrades to NULL and is counted, never skipped.
  let sk_geography = lookup_i64(
    tx,
    "SELECT sk_geography FROM dim_geography
      WHERE address IS ?1 AND city IS ?2 AND country IS ?3",
    params![line.ship_address, line.ship_city, line.ship_country],
  )?;
  if sk_geography.is_none() {
    stats.null_geography += 1;
  }
  let sk_shipper = match line.ship_via {
    Some(id) => lookup_i64(
      tx,
      "SELECT sk_shipper FROM dim_shipper WHERE nk_shipper_id = ?1",
      params![id],
    )?,
    None => None,
  };
  if sk_shipper.is_none() {
    stats.null_shipper += 1;
  }

  tx.execute(
    "INSERT INTO fact_sales
       (sk_customer, sk_product, sk_employee, sk_date, sk_ship_geography,
        sk_shipper, unit_price, quantity, discount, freight, total_amount,
        nk_order_id)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    params![
      sk_customer,
      sk_product,
      sk_employee,
      sk_date,
      sk_geography,
      sk_shipper,
      line.unit_price,
      line.quantity,
      line.discount,
      line.freight,
      total,
      line.order_id,
    ],
  )?;
  stats.inserted += 1;
  Ok(())
}

fn skip(
  tx: &Connection,
  run_id: i64,
  line: &OrderLineDelta,
  dimension: &str,
  policy: UnresolvedDimensionPolicy,
  stats: &mut FactStats,
) {
  stats.skipped_unresolved += 1;
  if policy == UnresolvedDimensionPolicy::Warn {
    warn!(
      order_id = line.order_id,
      product_id = line.product_id,
      dimension,
      "delta line skipped: dimension lookup missed"
    );
    record_metric(
      tx,
      run_id,
      "unresolved_dimension",
      &format!("fact_sales:{}:{}", line.order_id, line.product_id),
      &MetricResult::Warning,
      &format!("{dimension} lookup missed"),
      Severity::Medium,
    );
  }
}

fn lookup_i64(
  tx: &Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> granary_store::Result<Option<i64>> {
  Ok(tx.query_row(sql, params, |row| row.get(0)).optional()?)
}

/// Join the order and order-detail deltas into flat lines.
fn load_delta_lines(conn: &Connection) -> Result<Vec<OrderLineDelta>> {
  let mut stmt = conn.prepare(
    "SELECT o.order_id, od.product_id, o.customer_id, o.employee_id,
            o.order_date, o.ship_address, o.ship_city, o.ship_country,
            o.ship_via, o.freight, od.unit_price, od.quantity, od.discount
       FROM stg_order_details_delta od
       JOIN stg_orders_delta o ON o.order_id = od.order_id
      ORDER BY o.order_id, od.product_id",
  )?;
  let lines = stmt
    .query_map([], |row| {
      Ok((
        row.get::<_, i64>(0)?,
        row.get::<_, i64>(1)?,
        row.get::<_, Option<String>>(2)?,
        row.get::<_, Option<i64>>(3)?,
        row.get::<_, Option<String>>(4)?,
        row.get::<_, Option<String>>(5)?,
        row.get::<_, Option<String>>(6)?,
        row.get::<_, Option<String>>(7)?,
        row.get::<_, Option<i64>>(8)?,
        row.get::<_, Option<f64>>(9)?,
        row.get::<_, f64>(10)?,
        row.get::<_, i64>(11)?,
        row.get::<_, f64>(12)?,
      ))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  lines
    .into_iter()
    .map(
      |(order_id, product_id, customer, employee, date, addr, city, country, via, freight, price, qty, disc)| {
        Ok(OrderLineDelta {
          order_id,
          product_id,
          customer_id: customer,
          employee_id: employee,
          order_date: date.as_deref().map(decode_date).transpose().map_err(crate::Error::from)?,
          ship_address: addr,
          ship_city: city,
          ship_country: country,
          ship_via: via,
          freight,
          unit_price: price,
          quantity: qty,
          discount: disc,
        })
      },
    )
    .collect()
}
