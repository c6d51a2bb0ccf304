//! v001 -- Initial schema creation.
//!
//! Creates the `messages` table.  One row per message; the kind-specific
//! payload columns are nullable and only the columns relevant to `kind`
//! are populated.  `sent_at` is the sortable key, `timestamp` the display
//! string.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id         TEXT PRIMARY KEY NOT NULL,
    kind       TEXT NOT NULL,               -- text|image|video|gif|file|catalog
    text       TEXT,
    uri        TEXT,
    width      INTEGER,
    height     INTEGER,
    file_name  TEXT,
    file_size  TEXT,                        -- human-readable, e.g. "1.2 MB"
    title      TEXT,
    items      INTEGER,
    sender     TEXT NOT NULL,               -- self|remote
    timestamp  TEXT NOT NULL,               -- display string, e.g. "10:00 AM"
    sent_at    TEXT NOT NULL,               -- RFC-3339 sort key
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp);
CREATE INDEX IF NOT EXISTS idx_messages_sent_at   ON messages(sent_at);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
