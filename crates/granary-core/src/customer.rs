//! Customer dimension types and SCD Type 2 change classification.
//!
//! The customer dimension keeps full history: an attribute change never
//! overwrites a row. Instead the current row is expired and a new version
//! inserted with a fresh surrogate key. Classification of an incoming delta
//! record against the current row is pure logic and lives here; the
//! expire/insert choreography lives in `granary-etl`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─── Delta record ────────────────────────────────────────────────────────────

/// One customer record from the delta staging table. Carries only natural-key
/// attributes; surrogate keys are assigned by the warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDelta {
  /// Natural key — stable, assigned by the source OLTP system.
  pub customer_id:   String,
  pub company_name:  String,
  pub contact_name:  Option<String>,
  pub contact_title: Option<String>,
  pub address:       Option<String>,
  pub city:          Option<String>,
  pub region:        Option<String>,
  pub postal_code:   Option<String>,
  pub country:       Option<String>,
}

// ─── Dimension row ───────────────────────────────────────────────────────────

/// A version of a customer in the SCD2 dimension.
///
/// Invariants (enforced by the reconciler, checked by postcondition
/// validation): at most one row per natural key has `is_current = true`;
/// `valid_from <= valid_to` whenever `valid_to` is set; validity windows for
/// a natural key never overlap. Rows are expired, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDimRow {
  /// Surrogate key — system-generated, immutable once assigned.
  pub sk_customer:   i64,
  pub customer_id:   String,
  pub company_name:  String,
  pub contact_name:  Option<String>,
  pub contact_title: Option<String>,
  pub address:       Option<String>,
  pub city:          Option<String>,
  pub region:        Option<String>,
  pub postal_code:   Option<String>,
  pub country:       Option<String>,
  pub valid_from:    NaiveDate,
  pub valid_to:      Option<NaiveDate>,
  pub is_current:    bool,
}

// ─── Classification ──────────────────────────────────────────────────────────

/// The outcome of comparing a delta record against the current dimension row
/// for the same natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeClass {
  /// No row for this natural key exists at all.
  New,
  /// A current row exists and at least one tracked attribute differs.
  Changed,
  /// A current row exists and no tracked attribute differs.
  Unchanged,
}

/// Null-safe string equality: `None` and the empty string compare equal, so a
/// NULL-to-`''` round trip through staging never registers as a change.
fn attr_eq(a: Option<&str>, b: Option<&str>) -> bool {
  a.unwrap_or("") == b.unwrap_or("")
}

impl CustomerDimRow {
  /// True if any tracked descriptive attribute differs from the delta.
  /// Comparison is null-safe per [`attr_eq`].
  pub fn differs_from(&self, delta: &CustomerDelta) -> bool {
    self.company_name != delta.company_name
      || !attr_eq(self.contact_name.as_deref(), delta.contact_name.as_deref())
      || !attr_eq(self.contact_title.as_deref(), delta.contact_title.as_deref())
      || !attr_eq(self.address.as_deref(), delta.address.as_deref())
      || !attr_eq(self.city.as_deref(), delta.city.as_deref())
      || !attr_eq(self.region.as_deref(), delta.region.as_deref())
      || !attr_eq(self.postal_code.as_deref(), delta.postal_code.as_deref())
      || !attr_eq(self.country.as_deref(), delta.country.as_deref())
  }
}

/// Classify a delta record against the current row for its natural key, if
/// any. `current` must be the row with `is_current = true`, not a historical
/// version.
pub fn classify(current: Option<&CustomerDimRow>, delta: &CustomerDelta) -> ChangeClass {
  match current {
    None => ChangeClass::New,
    Some(row) if row.differs_from(delta) => ChangeClass::Changed,
    Some(_) => ChangeClass::Unchanged,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn current_row() -> CustomerDimRow {
    CustomerDimRow {
      sk_customer:   1,
      customer_id:   "ALFKI".into(),
      company_name:  "Alfreds Futterkiste".into(),
      contact_name:  Some("Maria Anders".into()),
      contact_title: Some("Sales Representative".into()),
      address:       Some("Obere Str. 57".into()),
      city:          Some("Berlin".into()),
      region:        None,
      postal_code:   Some("12209".into()),
      country:       Some("Germany".into()),
      valid_from:    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
      valid_to:      None,
      is_current:    true,
    }
  }

  fn matching_delta() -> CustomerDelta {
    CustomerDelta {
      customer_id:   "ALFKI".into(),
      company_name:  "Alfreds Futterkiste".into(),
      contact_name:  Some("Maria Anders".into()),
      contact_title: Some("Sales Representative".into()),
      address:       Some("Obere Str. 57".into()),
      city:          Some("Berlin".into()),
      region:        None,
      postal_code:   Some("12209".into()),
      country:       Some("Germany".into()),
    }
  }

  #[test]
  fn identical_delta_is_unchanged() {
    let row = current_row();
    assert_eq!(classify(Some(&row), &matching_delta()), ChangeClass::Unchanged);
  }

  #[test]
  fn null_and_empty_string_compare_equal() {
    let row = current_row(); // region is None
    let mut delta = matching_delta();
    delta.region = Some(String::new());
    assert_eq!(classify(Some(&row), &delta), ChangeClass::Unchanged);
  }

  #[test]
  fn changed_city_is_changed() {
    let row = current_row();
    let mut delta = matching_delta();
    delta.city = Some("Hamburg".into());
    assert_eq!(classify(Some(&row), &delta), ChangeClass::Changed);
  }

  #[test]
  fn missing_current_row_is_new() {
    assert_eq!(classify(None, &matching_delta()), ChangeClass::New);
  }
}
