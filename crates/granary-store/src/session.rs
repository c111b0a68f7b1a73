//! [`Warehouse`] — the single connection to the embedded warehouse file.

use std::path::Path;

use rusqlite::{Connection, Transaction};
use tracing::{debug, info};

use crate::{
  retry::{RetryPolicy, with_retry},
  schema::SCHEMA,
  Error, Result,
};

/// Connection-level settings applied before the schema. WAL keeps concurrent
/// readers alive while a batch writes; the busy timeout absorbs short lock
/// waits before the retry wrapper gets involved.
const CONNECTION_PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA busy_timeout = 30000;
PRAGMA synchronous = NORMAL;
";

// ─── Warehouse ───────────────────────────────────────────────────────────────

/// Handle to the warehouse database. One per pipeline run; the pipeline is
/// single-threaded, so there is no sharing to arrange.
pub struct Warehouse {
  conn:  Connection,
  retry: RetryPolicy,
}

impl Warehouse {
  /// Open (or create) the warehouse at `path`, apply connection pragmas, and
  /// run schema initialisation.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    info!(path = %path.as_ref().display(), "opening warehouse");
    let conn = Connection::open(path)?;
    Self::init(conn)
  }

  /// Open an in-memory warehouse — used by tests.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()?;
    Self::init(conn)
  }

  fn init(conn: Connection) -> Result<Self> {
    conn.execute_batch(CONNECTION_PRAGMAS)?;
    conn.execute_batch(SCHEMA)?;
    Ok(Self {
      conn,
      retry: RetryPolicy::default(),
    })
  }

  pub fn set_retry_policy(&mut self, policy: RetryPolicy) {
    self.retry = policy;
  }

  pub fn retry_policy(&self) -> &RetryPolicy {
    &self.retry
  }

  /// Read-only access for queries outside a transaction.
  pub fn conn(&self) -> &Connection {
    &self.conn
  }

  // ── Transactions ──────────────────────────────────────────────────────

  /// Run one logical unit inside a transaction, retrying the whole unit on
  /// lock contention. The closure must be safe to re-run from scratch: a
  /// failed attempt is rolled back before the next begins.
  pub fn with_tx<T>(
    &mut self,
    mut f: impl FnMut(&Transaction<'_>) -> Result<T>,
  ) -> Result<T> {
    let retry = self.retry;
    let conn = &mut self.conn;
    with_retry(&retry, move || {
      let tx = conn.transaction()?;
      let value = f(&tx)?;
      tx.commit()?;
      Ok(value)
    })
  }

  // ── Introspection ─────────────────────────────────────────────────────

  pub fn table_exists(&self, name: &str) -> Result<bool> {
    let count: i64 = self.conn.query_row(
      "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
      rusqlite::params![name],
      |row| row.get(0),
    )?;
    Ok(count > 0)
  }

  /// Row count of a known table. Errors with [`Error::MissingTable`] rather
  /// than a raw SQL error when the table does not exist.
  pub fn row_count(&self, table: &str) -> Result<i64> {
    if !self.table_exists(table)? {
      return Err(Error::MissingTable(table.to_owned()));
    }
    // Table names come from the fixed schema, never from input.
    let count: i64 = self
      .conn
      .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
    Ok(count)
  }

  // ── Maintenance ───────────────────────────────────────────────────────

  /// Truncate the write-ahead log and let SQLite refresh its query planner
  /// statistics. Run at the end of a batch so the WAL never grows without
  /// bound across scheduled runs.
  pub fn maintain(&self) -> Result<()> {
    debug!("running WAL checkpoint and optimize");
    self.conn.execute_batch(
      "PRAGMA wal_checkpoint(TRUNCATE);
       PRAGMA optimize;",
    )?;
    Ok(())
  }
}
