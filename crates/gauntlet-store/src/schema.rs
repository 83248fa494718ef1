//! Tenant database schema.
//!
//! Timestamps are stored as microseconds since the Unix epoch so that they
//! sort numerically.

/// SQL to create every table of a tenant database.
pub const CREATE_TENANT_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS events (
    date        TEXT PRIMARY KEY NOT NULL,
    name        TEXT,
    created_at  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS active_event (
    id          INTEGER PRIMARY KEY CHECK (id = 1),
    event_date  TEXT NOT NULL REFERENCES events (date) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS battle_state (
    id          INTEGER PRIMARY KEY CHECK (id = 1),
    version     INTEGER NOT NULL,
    payload     TEXT NOT NULL,
    updated_at  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS runs (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    event_date  TEXT NOT NULL REFERENCES events (date) ON DELETE CASCADE,
    round       INTEGER NOT NULL CHECK (round >= 1),
    boss        INTEGER NOT NULL CHECK (boss >= 1),
    member_id   TEXT NOT NULL,
    damage      INTEGER NOT NULL CHECK (damage >= 0),
    run_type    TEXT NOT NULL,
    boss_table  TEXT NOT NULL DEFAULT '',
    recorded_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_runs_event_date
    ON runs (event_date, recorded_at, id);

CREATE TABLE IF NOT EXISTS members (
    member_id   TEXT PRIMARY KEY NOT NULL,
    name        TEXT NOT NULL,
    nick        TEXT
);
";
