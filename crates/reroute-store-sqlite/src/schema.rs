//! SQL schema for the reroute SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per configured redirect, keyed by its normalized-input old URL.
-- 'suggestion' never appears in the state column; that state is derived
-- from the failures table on demand.
CREATE TABLE IF NOT EXISTS redirects (
    old_url              TEXT PRIMARY KEY,
    new_url              TEXT NOT NULL,
    state                TEXT NOT NULL,   -- 'saved' | 'ignored' | 'deleted'
    kind                 TEXT NOT NULL,   -- 'permanent' | 'temporary' | 'notfound' | 'gone'
    wildcard_skip_append INTEGER NOT NULL DEFAULT 0,
    updated_at           TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

-- Aggregated unmatched 404s: one row per distinct failing path.
CREATE TABLE IF NOT EXISTS failures (
    path       TEXT PRIMARY KEY,
    count      INTEGER NOT NULL,
    first_seen TEXT NOT NULL,
    last_seen  TEXT NOT NULL
);

-- Distinct referring URLs per failing path.
CREATE TABLE IF NOT EXISTS failure_referrers (
    path     TEXT NOT NULL REFERENCES failures(path) ON DELETE CASCADE,
    referrer TEXT NOT NULL,
    UNIQUE (path, referrer)
);

CREATE INDEX IF NOT EXISTS redirects_state_idx ON redirects(state);
CREATE INDEX IF NOT EXISTS failures_last_seen_idx ON failures(last_seen);

PRAGMA user_version = 1;
";
