//! Sales fact types and measure derivation.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// ─── Delta record ────────────────────────────────────────────────────────────

/// One order line from the delta, joined from the order and order-detail
/// staging tables. The reconciliation identity is (`order_id`, product
/// surrogate key); everything else is either a dimension natural key or a
/// measure.
#[derive(Debug, Clone)]
pub struct OrderLineDelta {
  pub order_id:         i64,
  pub product_id:       i64,
  pub customer_id:      Option<String>,
  pub employee_id:      Option<i64>,
  pub order_date:       Option<NaiveDate>,
  pub ship_address:     Option<String>,
  pub ship_city:        Option<String>,
  pub ship_country:     Option<String>,
  pub ship_via:         Option<i64>,
  pub freight:          Option<f64>,
  pub unit_price:       f64,
  pub quantity:         i64,
  pub discount:         f64,
}

// ─── Derived measure ─────────────────────────────────────────────────────────

/// The line total. Always recomputed from its three inputs; an upstream
/// `total_amount` column is never trusted.
pub fn total_amount(unit_price: f64, quantity: i64, discount: f64) -> f64 {
  unit_price * quantity as f64 * (1.0 - discount)
}

/// The date dimension surrogate key: the calendar date as a YYYYMMDD integer.
pub fn date_key(date: NaiveDate) -> i64 {
  date.year() as i64 * 10_000 + date.month() as i64 * 100 + date.day() as i64
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// What to do with a delta line whose customer, product, employee, or date
/// dimension lookup fails during the fact insert pass. The row is skipped
/// either way — no fact is ever written with a fabricated required key — the
/// policy only controls whether the skip is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedDimensionPolicy {
  /// Skip silently (compatible with the legacy loader).
  Drop,
  /// Skip, count, and report a WARNING-level metric.
  #[default]
  Warn,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn total_amount_applies_discount() {
    let total = total_amount(10.0, 3, 0.25);
    assert!((total - 22.5).abs() < 1e-9);
  }

  #[test]
  fn total_amount_zero_discount_is_price_times_quantity() {
    let total = total_amount(19.99, 2, 0.0);
    assert!((total - 39.98).abs() < 1e-9);
  }

  #[test]
  fn date_key_packs_ymd() {
    let d = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();
    assert_eq!(date_key(d), 20240507);
  }
}
