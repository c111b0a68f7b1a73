//! Bounded retry with exponential backoff and jitter.
//!
//! Every transactional unit in the pipeline goes through [`with_retry`].
//! Only lock/busy conditions are retried; a constraint violation or a
//! malformed statement fails immediately.

use std::{
  thread,
  time::{Duration, SystemTime, UNIX_EPOCH},
};

use tracing::warn;

use crate::{Error, Result};

// ─── Policy ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_attempts:  u32,
  pub base_delay_ms: u64,
  pub max_delay_ms:  u64,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts:  5,
      base_delay_ms: 100,
      max_delay_ms:  3_000,
    }
  }
}

impl RetryPolicy {
  /// Exponential delay for a zero-based attempt number, capped at
  /// `max_delay_ms`, plus up to 25% jitter so contending batch processes
  /// don't wake in lockstep.
  pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
    let exp = self
      .base_delay_ms
      .saturating_mul(1u64 << attempt.min(16))
      .min(self.max_delay_ms);
    let jitter_span = exp / 4 + 1;
    let nanos = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map(|d| d.subsec_nanos() as u64)
      .unwrap_or(0);
    Duration::from_millis(exp + nanos % jitter_span)
  }
}

// ─── Wrapper ─────────────────────────────────────────────────────────────────

/// Run `op`, retrying on lock contention up to the policy's attempt budget.
///
/// Non-retryable errors propagate immediately. Exhaustion converts the final
/// database error into [`Error::RetryExhausted`].
pub fn with_retry<T>(
  policy: &RetryPolicy,
  mut op: impl FnMut() -> Result<T>,
) -> Result<T> {
  let mut attempt = 0u32;
  loop {
    match op() {
      Ok(value) => return Ok(value),
      Err(err) if err.is_retryable() && attempt + 1 < policy.max_attempts => {
        let delay = policy.delay_for_attempt(attempt);
        warn!(
          attempt = attempt + 1,
          max = policy.max_attempts,
          delay_ms = delay.as_millis() as u64,
          "database busy, backing off"
        );
        thread::sleep(delay);
        attempt += 1;
      }
      Err(Error::Database(source)) if sqlite_contention(&source) => {
        return Err(Error::RetryExhausted {
          attempts: policy.max_attempts,
          source,
        });
      }
      Err(err) => return Err(err),
    }
  }
}

fn sqlite_contention(e: &rusqlite::Error) -> bool {
  crate::error::sqlite_busy(e)
}
