//! Encoding helpers between chrono types and the plain-text representations
//! stored in SQLite columns.
//!
//! Calendar dates are stored as `YYYY-MM-DD` so lexicographic comparison in
//! SQL matches chronological order; timestamps are RFC 3339 UTC.

use chrono::{DateTime, NaiveDate, Utc};

use crate::{Error, Result};

pub fn encode_date(d: NaiveDate) -> String {
  d.format("%Y-%m-%d").to_string()
}

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}
