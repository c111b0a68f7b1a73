//! Incremental-update engine for the Granary warehouse.
//!
//! Four components, run in a fixed order by the [`orchestrator`]:
//! data-quality [`remediation`], the SCD Type 2 customer reconciler
//! ([`scd2`]), the sales-fact reconciler ([`facts`]), and the
//! pre/postcondition checks ([`validate`]). Each component operation takes
//! the warehouse handle and the current ledger run id, does its work inside
//! retried transactions, and returns a stats struct.

pub mod error;
pub mod facts;
pub mod orchestrator;
pub mod remediation;
pub mod scd2;
pub mod validate;

pub use error::{Error, Result};
pub use orchestrator::{BatchOptions, run_batch};
