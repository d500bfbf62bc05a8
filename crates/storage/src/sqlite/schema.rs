//! Counter table schema and statements for SQLite

use super::map_sqlite_error;
use rusqlite::Connection;
use wishid_core::Result;

/// Name of the counter table
pub const COUNTER_TABLE: &str = "id_counters";

/// Idempotent DDL for the counter table
pub const CREATE_COUNTER_TABLE: &str = "CREATE TABLE IF NOT EXISTS id_counters (
    type INTEGER NOT NULL PRIMARY KEY,
    value INTEGER NOT NULL
)";

pub(crate) const SELECT_VALUE: &str = "SELECT value FROM id_counters WHERE type = ?1";

pub(crate) const SELECT_ALL: &str = "SELECT type, value FROM id_counters ORDER BY type";

pub(crate) const INSERT_ROW: &str = "INSERT INTO id_counters (type, value) VALUES (?1, ?2)";

pub(crate) const UPDATE_ROW: &str = "UPDATE id_counters SET value = ?2 WHERE type = ?1";

/// Returns no row when the stored value is already `i64::MAX`
pub(crate) const UPSERT_INCREMENT: &str = "INSERT INTO id_counters (type, value) VALUES (?1, 1)
    ON CONFLICT(type) DO UPDATE SET value = value + 1
    WHERE value < 9223372036854775807
    RETURNING value";

/// Create the counter table if it does not exist
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_COUNTER_TABLE)
        .map_err(map_sqlite_error)
}
