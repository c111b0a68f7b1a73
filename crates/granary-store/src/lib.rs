//! SQLite access layer for the Granary warehouse.
//!
//! One embedded database file holds the staging, warehouse, and data-quality
//! mart tables. Everything here is synchronous: the pipeline is a
//! single-threaded batch, and the only contention is other pipeline
//! invocations holding the file lock — handled by WAL journaling, a generous
//! busy timeout, and bounded retry around each transactional unit.

mod encode;
mod schema;

pub mod error;
pub mod metrics;
pub mod retry;
pub mod session;

pub use encode::{decode_date, decode_dt, encode_date, encode_dt};
pub use error::{Error, Result};
pub use retry::{RetryPolicy, with_retry};
pub use session::Warehouse;

#[cfg(test)]
mod tests;
