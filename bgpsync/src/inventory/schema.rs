//! SQL schema for the SQLite inventory.

/// Table DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS bgp_sessions (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    neighbor_address  TEXT    NOT NULL UNIQUE,
    remote_as         INTEGER NOT NULL,
    local_as          INTEGER NOT NULL DEFAULT 0,
    local_address     TEXT    NOT NULL DEFAULT '',
    description       TEXT    NOT NULL DEFAULT '',
    device_identifier TEXT    NOT NULL,
    device_vendor     TEXT    NOT NULL DEFAULT 'unknown',
    connectivity      TEXT    NOT NULL DEFAULT 'Unknown',
    session_state     TEXT    NOT NULL DEFAULT 'Unknown',
    last_updated      TEXT    NOT NULL    -- RFC 3339 UTC
);

CREATE INDEX IF NOT EXISTS bgp_sessions_device_idx ON bgp_sessions(device_identifier);
";

/// Columns missing from tables created by the first release, with their
/// definitions. They are added with `ALTER TABLE` at startup.
pub const ADDED_COLUMNS: &[(&str, &str)] = &[
    ("local_as", "INTEGER NOT NULL DEFAULT 0"),
    ("local_address", "TEXT NOT NULL DEFAULT ''"),
    ("session_state", "TEXT NOT NULL DEFAULT 'Unknown'"),
    ("description", "TEXT NOT NULL DEFAULT ''"),
];
