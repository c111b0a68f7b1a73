//! `granary` — run one incremental-update batch against the warehouse.
//!
//! Reads `granary.toml` (or the path given with `--config`), applies
//! `GRANARY_`-prefixed environment overrides, runs the batch, and exits 0 on
//! SUCCESS or PARTIAL, 1 on FAILED, 2 when the batch could not start at all.
//!
//! # Usage
//!
//! ```
//! granary --database warehouse.db --batch-date 2024-06-01
//! granary --config /etc/granary.toml --report
//! ```

use std::{path::PathBuf, process::ExitCode};

use anyhow::Context as _;
use chrono::{NaiveDate, Utc};
use clap::Parser;
use granary_core::{run::RunState, sales::UnresolvedDimensionPolicy};
use granary_etl::{BatchOptions, run_batch};
use granary_store::{RetryPolicy, Warehouse};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "granary", about = "Incremental warehouse update batch")]
struct Args {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "granary.toml")]
  config: PathBuf,

  /// Warehouse database file (overrides the config file).
  #[arg(long, value_name = "FILE")]
  database: Option<PathBuf>,

  /// Batch date for SCD2 versioning, YYYY-MM-DD (default: today).
  #[arg(long, value_name = "DATE")]
  batch_date: Option<NaiveDate>,

  /// Print the JSON batch summary to stdout.
  #[arg(long)]
  report: bool,
}

// ─── Settings ─────────────────────────────────────────────────────────────────

/// Shape of the config file plus `GRANARY_` environment overrides.
#[derive(Deserialize, Debug)]
#[serde(default)]
struct Settings {
  database_path:     PathBuf,
  batch_date:        Option<NaiveDate>,
  unresolved_policy: UnresolvedDimensionPolicy,
  region_fallback:   String,
  retry_attempts:    u32,
  retry_base_ms:     u64,
  retry_max_ms:      u64,
}

impl Default for Settings {
  fn default() -> Self {
    let retry = RetryPolicy::default();
    Self {
      database_path:     PathBuf::from("granary.db"),
      batch_date:        None,
      unresolved_policy: UnresolvedDimensionPolicy::default(),
      region_fallback:   granary_core::region::DEFAULT_REGION_FALLBACK.to_owned(),
      retry_attempts:    retry.max_attempts,
      retry_base_ms:     retry.base_delay_ms,
      retry_max_ms:      retry.max_delay_ms,
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();
  match run(args) {
    Ok(RunState::Success | RunState::Partial) => ExitCode::SUCCESS,
    Ok(_) => ExitCode::from(1),
    Err(err) => {
      tracing::error!(error = %format!("{err:#}"), "batch could not run");
      ExitCode::from(2)
    }
  }
}

fn run(args: Args) -> anyhow::Result<RunState> {
  let settings = config::Config::builder()
    .add_source(config::File::from(args.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("GRANARY"))
    .build()
    .context("failed to read config")?;
  let settings: Settings = settings
    .try_deserialize()
    .context("failed to deserialise settings")?;

  let database = args.database.unwrap_or(settings.database_path);
  let mut wh = Warehouse::open(&database)
    .with_context(|| format!("failed to open warehouse at {}", database.display()))?;
  wh.set_retry_policy(RetryPolicy {
    max_attempts:  settings.retry_attempts,
    base_delay_ms: settings.retry_base_ms,
    max_delay_ms:  settings.retry_max_ms,
  });

  let options = BatchOptions {
    batch_date:        args
      .batch_date
      .or(settings.batch_date)
      .unwrap_or_else(|| Utc::now().date_naive()),
    unresolved_policy: settings.unresolved_policy,
    region_fallback:   settings.region_fallback,
  };

  let summary = run_batch(&mut wh, &options).context("batch run failed")?;
  if args.report {
    println!("{}", summary.to_json().context("serialising summary")?);
  }
  Ok(summary.state)
}
