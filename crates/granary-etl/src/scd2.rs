//! SCD Type 2 reconciliation of the customer dimension.
//!
//! Each delta natural key is classified against the current dimension row
//! with null-safe attribute comparison, then the whole batch is applied in
//! one transaction: changed keys expire their current row and insert a
//! replacement version, new keys insert a first version, unchanged keys are
//! untouched. History is append-only; nothing is deleted.

use chrono::{Days, NaiveDate};
use granary_core::{
  customer::{ChangeClass, CustomerDelta, CustomerDimRow, classify},
  metric::{MetricResult, Severity},
  run::Scd2Stats,
};
use granary_store::{Warehouse, decode_date, encode_date, metrics::record_metric};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{info, warn};

use crate::{Error, Result};

pub fn reconcile_customers(
  wh: &mut Warehouse,
  run_id: i64,
  batch_date: NaiveDate,
) -> Result<Scd2Stats> {
  let expiry = batch_date
    .checked_sub_days(Days::new(1))
    .ok_or_else(|| Error::Core(granary_core::Error::InvalidDate(batch_date.to_string())))?;

  let (deltas, duplicates_dropped) = load_deduped_deltas(wh.conn())?;
  if duplicates_dropped > 0 {
    warn!(duplicates_dropped, "duplicate natural keys in customer delta");
    record_metric(
      wh.conn(),
      run_id,
      "duplicate_delta_keys",
      "stg_customers_delta",
      &MetricResult::Warning,
      &format!("{duplicates_dropped} duplicate rows dropped, last row wins"),
      Severity::Medium,
    );
  }

  let stats = wh.with_tx(|tx| {
    let mut stats = Scd2Stats {
      duplicates_dropped,
      ..Scd2Stats::default()
    };

    for delta in &deltas {
      let current = current_row(tx, &delta.customer_id)?;
      match classify(current.as_ref(), delta) {
        ChangeClass::Unchanged => stats.unchanged += 1,
        ChangeClass::New => {
          insert_version(tx, delta, batch_date)?;
          stats.new += 1;
        }
        ChangeClass::Changed => {
          // Changed implies a current row exists.
          match &current {
            // A version opened today changing again would be expired to
            // `batch_date - 1`, before its own valid_from. Rewrite the
            // same-day version in place instead of versioning it.
            Some(current) if current.valid_from >= batch_date => {
              overwrite_version(tx, current.sk_customer, delta)?;
            }
            Some(current) => {
              tx.execute(
                "UPDATE dim_customer
                    SET valid_to = ?1, is_current = 0
                  WHERE sk_customer = ?2",
                params![encode_date(expiry), current.sk_customer],
              )?;
              insert_version(tx, delta, batch_date)?;
            }
            None => insert_version(tx, delta, batch_date)?,
          }
          stats.changed += 1;
        }
      }
    }

    record_metric(
      tx,
      run_id,
      "scd2_reconciled",
      "dim_customer",
      &MetricResult::Count((stats.changed + stats.new) as i64),
      &format!(
        "changed={} new={} unchanged={}",
        stats.changed, stats.new, stats.unchanged
      ),
      Severity::Low,
    );
    Ok(stats)
  })?;

  info!(
    changed = stats.changed,
    new = stats.new,
    unchanged = stats.unchanged,
    "customer reconciliation complete"
  );
  Ok(stats)
}

/// Load the delta in input order, keeping only the last row per natural key.
fn load_deduped_deltas(conn: &Connection) -> Result<(Vec<CustomerDelta>, u64)> {
  let mut stmt = conn.prepare(
    "SELECT customer_id, company_name, contact_name, contact_title, address,
            city, region, postal_code, country
       FROM stg_customers_delta
      ORDER BY rowid",
  )?;
  let rows = stmt
    .query_map([], |row| {
      Ok(CustomerDelta {
        customer_id:   row.get(0)?,
        company_name:  row.get(1)?,
        contact_name:  row.get(2)?,
        contact_title: row.get(3)?,
        address:       row.get(4)?,
        city:          row.get(5)?,
        region:        row.get(6)?,
        postal_code:   row.get(7)?,
        country:       row.get(8)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut deduped: Vec<CustomerDelta> = Vec::with_capacity(rows.len());
  let mut duplicates = 0u64;
  for delta in rows {
    if let Some(existing) = deduped
      .iter_mut()
      .find(|d| d.customer_id == delta.customer_id)
    {
      *existing = delta;
      duplicates += 1;
    } else {
      deduped.push(delta);
    }
  }
  Ok((deduped, duplicates))
}

fn current_row(
  tx: &Connection,
  customer_id: &str,
) -> granary_store::Result<Option<CustomerDimRow>> {
  tx.query_row(
    "SELECT sk_customer, nk_customer_id, company_name, contact_name,
            contact_title, address, city, region, postal_code, country,
            valid_from, valid_to
       FROM dim_customer
      WHERE nk_customer_id = ?1 AND is_current = 1",
    params![customer_id],
    |row| {
      Ok((
        row.get::<_, i64>(0)?,
        row.get::<_, String>(1)?,
        row.get::<_, String>(2)?,
        row.get::<_, Option<String>>(3)?,
        row.get::<_, Option<String>>(4)?,
        row.get::<_, Option<String>>(5)?,
        row.get::<_, Option<String>>(6)?,
        row.get::<_, Option<String>>(7)?,
        row.get::<_, Option<String>>(8)?,
        row.get::<_, Option<String>>(9)?,
        row.get::<_, String>(10)?,
        row.get::<_, Option<String>>(11)?,
      ))
    },
  )
  .optional()?
  .map(|(sk, nk, company, contact, title, addr, city, region, postal, country, from, to)| {
    Ok(CustomerDimRow {
      sk_customer:   sk,
      customer_id:   nk,
      company_name:  company,
      contact_name:  contact,
      contact_title: title,
      address:       addr,
      city:          city,
      region:        region,
      postal_code:   postal,
      country:       country,
      valid_from:    decode_date(&from)?,
      valid_to:      to.as_deref().map(decode_date).transpose()?,
      is_current:    true,
    })
  })
  .transpose()
}

/// Rewrite a same-day version's attributes, keeping its surrogate key,
/// validity window, and current flag.
fn overwrite_version(
  tx: &Connection,
  sk_customer: i64,
  delta: &CustomerDelta,
) -> granary_store::Result<()> {
  tx.execute(
    "UPDATE dim_customer
        SET company_name = ?1, contact_name = ?2, contact_title = ?3,
            address = ?4, city = ?5, region = ?6, postal_code = ?7,
            country = ?8
      WHERE sk_customer = ?9",
    params![
      delta.company_name,
      delta.contact_name,
      delta.contact_title,
      delta.address,
      delta.city,
      delta.region,
      delta.postal_code,
      delta.country,
      sk_customer,
    ],
  )?;
  Ok(())
}

fn insert_version(
  tx: &Connection,
  delta: &CustomerDelta,
  valid_from: NaiveDate,
) -> granary_store::Result<()> {
  tx.execute(
    "INSERT INTO dim_customer
       (nk_customer_id, company_name, contact_name, contact_title, address,
        city, region, postal_code, country, valid_from, valid_to, is_current)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL, 1)",
    params![
      delta.customer_id,
      delta.company_name,
      delta.contact_name,
      delta.contact_title,
      delta.address,
      delta.city,
      delta.region,
      delta.postal_code,
      delta.country,
      encode_date(valid_from),
    ],
  )?;
  Ok(())
}
