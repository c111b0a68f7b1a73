//! Contact-data synthesis for suppliers and customers.
//!
//! Synthesised values are placeholder filler, not part of the factual record:
//! every generated value carries a `(machine-generated)` marker, and the
//! business-domain pick is a pure function of the record's natural key so
//! repeated runs produce identical output.

use sha2::{Digest, Sha256};

// ─── Fax patterns ────────────────────────────────────────────────────────────

/// Per-country fax placeholder templates.
const FAX_PATTERNS: &[(&str, &str)] = &[
  ("Germany", "+49-XXX-XXXXXXX"),
  ("USA", "+1-XXX-XXX-XXXX"),
  ("France", "+33-X-XX-XX-XX-XX"),
  ("UK", "+44-XXX-XXX-XXXX"),
];

/// Country-agnostic fallback template.
const FAX_FALLBACK: &str = "+XX-XXX-XXXXXXX";

/// Marker appended to every synthesised value.
pub const GENERATED_MARKER: &str = "(machine-generated)";

/// A placeholder fax number for `country`, marked as machine-generated.
pub fn placeholder_fax(country: Option<&str>) -> String {
  let pattern = country
    .and_then(|c| FAX_PATTERNS.iter().find(|(k, _)| *k == c))
    .map(|(_, p)| *p)
    .unwrap_or(FAX_FALLBACK);
  format!("{pattern} {GENERATED_MARKER}")
}

// ─── Homepage synthesis ──────────────────────────────────────────────────────

/// Candidate business-domain suffixes for synthesised homepages.
const BUSINESS_DOMAINS: &[&str] = &[
  "company.com",
  "business.org",
  "corp.net",
  "enterprise.biz",
  "trading.com",
  "suppliers.net",
  "wholesale.com",
];

/// Lowercase the company name, drop punctuation and spaces, spell out `&`,
/// and truncate to 15 characters.
fn slug(company_name: &str) -> String {
  let mut out = String::new();
  for ch in company_name.chars() {
    if out.len() >= 15 {
      break;
    }
    if ch == '&' {
      out.push_str("and");
    } else if ch.is_ascii_alphanumeric() {
      out.push(ch.to_ascii_lowercase());
    }
  }
  out
}

/// A placeholder homepage URL for a supplier or customer without one.
///
/// The domain suffix is chosen by hashing the natural key, so the same record
/// always gets the same URL across runs.
pub fn placeholder_homepage(company_name: &str, natural_key: &str) -> String {
  let name = slug(company_name);
  let name = if name.is_empty() {
    format!("entity{}", slug(natural_key))
  } else {
    name
  };

  let digest = Sha256::digest(natural_key.as_bytes());
  let index = digest[0] as usize % BUSINESS_DOMAINS.len();
  format!("http://www.{name}.{}", BUSINESS_DOMAINS[index])
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fax_uses_country_pattern() {
    let fax = placeholder_fax(Some("Germany"));
    assert!(fax.starts_with("+49-"));
    assert!(fax.ends_with(GENERATED_MARKER));
  }

  #[test]
  fn fax_falls_back_for_unknown_country() {
    assert!(placeholder_fax(Some("Atlantis")).starts_with("+XX-"));
    assert!(placeholder_fax(None).starts_with("+XX-"));
  }

  #[test]
  fn slug_strips_and_truncates() {
    assert_eq!(slug("Specialty Biscuits, Ltd."), "specialtybiscui");
    assert_eq!(slug("G'day & Mate"), "gdayandmate");
  }

  #[test]
  fn homepage_is_deterministic_per_key() {
    let a = placeholder_homepage("Exotic Liquids", "1");
    let b = placeholder_homepage("Exotic Liquids", "1");
    assert_eq!(a, b);
    assert!(a.starts_with("http://www.exoticliquids."));
  }

  #[test]
  fn homepage_handles_empty_company_name() {
    let url = placeholder_homepage("", "42");
    assert!(url.starts_with("http://www.entity42."));
  }
}
