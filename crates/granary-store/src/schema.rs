//! SQL schema for the Granary warehouse file.
//!
//! Executed at connection startup; idempotent thanks to
//! `CREATE TABLE IF NOT EXISTS`. The delta staging tables are populated by
//! the upstream ingestion job before the orchestrator runs.

/// Full schema DDL.
pub const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

-- ── Dimensions ──────────────────────────────────────────────────────────

-- Customer dimension, SCD Type 2. Rows are expired, never deleted.
CREATE TABLE IF NOT EXISTS dim_customer (
    sk_customer    INTEGER PRIMARY KEY AUTOINCREMENT,
    nk_customer_id TEXT NOT NULL,
    company_name   TEXT NOT NULL,
    contact_name   TEXT,
    contact_title  TEXT,
    address        TEXT,
    city           TEXT,
    region         TEXT,
    postal_code    TEXT,
    country        TEXT,
    valid_from     TEXT NOT NULL,   -- YYYY-MM-DD
    valid_to       TEXT,            -- NULL while the version is open-ended
    is_current     INTEGER NOT NULL -- 1 current, 0 historical
);

CREATE TABLE IF NOT EXISTS dim_product (
    sk_product      INTEGER PRIMARY KEY AUTOINCREMENT,
    nk_product_id   INTEGER NOT NULL,
    product_name    TEXT NOT NULL,
    category_name   TEXT,
    supplier_name   TEXT,
    unit_price      REAL,
    discontinued    INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS dim_employee (
    sk_employee    INTEGER PRIMARY KEY AUTOINCREMENT,
    nk_employee_id INTEGER NOT NULL,
    full_name      TEXT NOT NULL,
    title          TEXT,
    city           TEXT,
    region         TEXT,
    country        TEXT
);

-- Date dimension; the surrogate key is the date packed as YYYYMMDD.
CREATE TABLE IF NOT EXISTS dim_date (
    sk_date  INTEGER PRIMARY KEY,
    date     TEXT NOT NULL,
    year     INTEGER NOT NULL,
    month    INTEGER NOT NULL,
    day      INTEGER NOT NULL,
    quarter  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS dim_geography (
    sk_geography INTEGER PRIMARY KEY AUTOINCREMENT,
    address      TEXT,
    city         TEXT,
    region       TEXT,
    postal_code  TEXT,
    country      TEXT
);

CREATE TABLE IF NOT EXISTS dim_shipper (
    sk_shipper    INTEGER PRIMARY KEY AUTOINCREMENT,
    nk_shipper_id INTEGER NOT NULL,
    company_name  TEXT NOT NULL,
    phone         TEXT
);

-- ── Fact table ──────────────────────────────────────────────────────────

-- Reconciliation identity is (nk_order_id, sk_product); sk_sale is the
-- row's own surrogate. Geography and shipper keys may be NULL when the
-- lookup missed at load time (known degradation, counted by validation).
CREATE TABLE IF NOT EXISTS fact_sales (
    sk_sale           INTEGER PRIMARY KEY AUTOINCREMENT,
    sk_customer       INTEGER NOT NULL REFERENCES dim_customer(sk_customer),
    sk_product        INTEGER NOT NULL REFERENCES dim_product(sk_product),
    sk_employee       INTEGER NOT NULL REFERENCES dim_employee(sk_employee),
    sk_date           INTEGER NOT NULL REFERENCES dim_date(sk_date),
    sk_ship_geography INTEGER REFERENCES dim_geography(sk_geography),
    sk_shipper        INTEGER REFERENCES dim_shipper(sk_shipper),
    unit_price        REAL NOT NULL,
    quantity          INTEGER NOT NULL,
    discount          REAL NOT NULL,
    freight           REAL,
    total_amount      REAL NOT NULL,   -- always recomputed, never ingested
    nk_order_id       INTEGER NOT NULL
);

-- ── Delta staging (written by the upstream ingestion job) ───────────────

CREATE TABLE IF NOT EXISTS stg_customers_delta (
    customer_id   TEXT NOT NULL,
    company_name  TEXT NOT NULL,
    contact_name  TEXT,
    contact_title TEXT,
    address       TEXT,
    city          TEXT,
    region        TEXT,
    postal_code   TEXT,
    country       TEXT,
    fax           TEXT
);

CREATE TABLE IF NOT EXISTS stg_orders_delta (
    order_id         INTEGER NOT NULL,
    customer_id      TEXT,
    employee_id      INTEGER,
    order_date       TEXT,
    shipped_date     TEXT,
    ship_via         INTEGER,
    freight          REAL,
    ship_address     TEXT,
    ship_city        TEXT,
    ship_region      TEXT,
    ship_postal_code TEXT,
    ship_country     TEXT
);

CREATE TABLE IF NOT EXISTS stg_order_details_delta (
    order_id   INTEGER NOT NULL,
    product_id INTEGER NOT NULL,
    unit_price REAL NOT NULL,
    quantity   INTEGER NOT NULL,
    discount   REAL NOT NULL
);

-- ── Reference staging ───────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS stg_suppliers (
    supplier_id  INTEGER NOT NULL,
    company_name TEXT NOT NULL,
    country      TEXT,
    city         TEXT,
    region       TEXT,
    fax          TEXT,
    home_page    TEXT
);

-- External country-statistics dataset.
CREATE TABLE IF NOT EXISTS stg_world_stats (
    country      TEXT NOT NULL,
    largest_city TEXT,
    gdp          REAL,
    minimum_wage REAL
);

-- ── Data-quality mart ───────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS dqm_process_runs (
    run_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    process_name  TEXT NOT NULL,
    started_at    TEXT NOT NULL,   -- RFC 3339 UTC
    finished_at   TEXT,
    state         TEXT NOT NULL,   -- IN_PROGRESS | SUCCESS | PARTIAL | FAILED
    duration_secs REAL,
    comment       TEXT
);

-- Append-only; one row per quality observation.
CREATE TABLE IF NOT EXISTS dqm_quality_indicators (
    indicator_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id         INTEGER NOT NULL REFERENCES dqm_process_runs(run_id),
    indicator_name TEXT NOT NULL,
    entity         TEXT NOT NULL,
    result         TEXT NOT NULL,   -- PASS | WARNING | FAIL | ERROR | <count>
    detail         TEXT,
    severity       TEXT NOT NULL DEFAULT 'LOW'
);

CREATE INDEX IF NOT EXISTS dim_customer_nk_idx
    ON dim_customer(nk_customer_id, is_current);
CREATE INDEX IF NOT EXISTS fact_sales_identity_idx
    ON fact_sales(nk_order_id, sk_product);
CREATE INDEX IF NOT EXISTS dqm_indicators_run_idx
    ON dqm_quality_indicators(run_id);
";
